use std::sync::Arc;

use askama::Template;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use time::{OffsetDateTime, macros::datetime};
use tower::ServiceExt;
use vista::{
    application::{
        context::{MODEL_ATTRIBUTE, RenderContext},
        error::RenderError,
        resolver::candidate_paths,
    },
    config::ViewSettings,
    domain::{
        types::{Model, ModelRef, TypeDescriptor},
        value::Markup,
    },
    infra::http::{HttpRequest, PageRegistry, RenderState, build_router},
    presentation::{
        pages::{ContextPage, StaticPage},
        views::TemplatePage,
    },
};

static PARTY: TypeDescriptor = TypeDescriptor::new("app.Party");
static PERSON: TypeDescriptor = TypeDescriptor::extending("app.Person", &PARTY);

#[derive(Clone)]
struct Person {
    name: String,
    joined: OffsetDateTime,
    balance: f64,
}

impl Model for Person {
    fn descriptor(&self) -> &'static TypeDescriptor {
        &PERSON
    }
}

fn ada() -> ModelRef {
    Arc::new(Person {
        name: "Ada Lovelace".to_string(),
        joined: datetime!(2024-03-05 12:00 UTC),
        balance: 1234.5,
    })
}

#[derive(Template)]
#[template(
    ext = "html",
    source = "<section class=\"card\">{{ name }} / {{ balance }}</section>"
)]
struct PersonCard {
    name: String,
    balance: String,
}

fn party_index(ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
    let it = ctx.resource()?;
    ctx.write(Markup::new("<div class=\"party\">"))?;
    if let Some(person) = it.downcast_ref::<Person>() {
        let name = person.name.clone();
        ctx.write_xml_escape(name)?;
        ctx.write(" since ")?;
        ctx.write(person.joined)?;
    }
    ctx.write(Markup::new("</div>"))
}

fn person_card(ctx: &mut RenderContext<'_>) -> Result<PersonCard, RenderError> {
    let person: Person = ctx.resource_as()?;
    Ok(PersonCard {
        name: person.name,
        balance: ctx.to_string(person.balance)?,
    })
}

fn profile(ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
    ctx.write(Markup::new("<main>"))?;
    ctx.view_index(Some(ada()))?;
    ctx.view(Some(ada()), "card")?;
    if ctx.request().attribute(MODEL_ATTRIBUTE).is_none() {
        ctx.write(Markup::new("<!-- clean -->"))?;
    }
    ctx.write(Markup::new("</main>"))
}

fn missing_view(ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
    ctx.write("partial output")?;
    ctx.view(Some(ada()), "timeline")
}

fn registry() -> PageRegistry {
    PageRegistry::new()
        .with_page(
            "/WEB-INF/app/Party.index.html",
            ContextPage::new(party_index),
        )
        .with_page("/app/Person.card.html", TemplatePage::new(person_card))
        .with_page("/people/ada.html", ContextPage::new(profile))
        .with_page("/people/broken.html", ContextPage::new(missing_view))
        .with_page("/index.html", StaticPage::new("<h1>home</h1>", "text/html"))
}

fn app() -> Router {
    build_router(RenderState::new(
        Arc::new(registry()),
        ViewSettings::default(),
    ))
}

async fn get(uri: &str, accept_language: Option<&str>) -> (StatusCode, String) {
    let mut request = Request::builder().method(Method::GET).uri(uri);
    if let Some(language) = accept_language {
        request = request.header(header::ACCEPT_LANGUAGE, language);
    }
    let request = request.body(Body::empty()).expect("request should build");

    let response = app().oneshot(request).await.expect("router should respond");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    (status, String::from_utf8(body.to_vec()).expect("utf-8 body"))
}

#[tokio::test]
async fn views_resolve_through_the_type_chain() {
    let (status, body) = get("/people/ada.html", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        concat!(
            "<main>",
            "<div class=\"party\">Ada Lovelace since Tuesday, March 5, 2024</div>",
            "<section class=\"card\">Ada Lovelace / 1,234.5</section>",
            "<!-- clean -->",
            "</main>"
        )
    );
}

#[tokio::test]
async fn captured_views_format_for_the_request_locale() {
    let (status, body) = get("/people/ada.html", Some("de-DE,de;q=0.9,en;q=0.5")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("since Dienstag, 5. März 2024"), "{body}");
    assert!(body.contains(" / 1.234,5</section>"), "{body}");
}

#[tokio::test]
async fn directory_requests_forward_to_their_index() {
    let (status, body) = get("/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>home</h1>");
}

#[tokio::test]
async fn unknown_paths_answer_not_found() {
    let (status, body) = get("/people/grace.html", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Page not found"), "{body}");
}

#[tokio::test]
async fn missing_views_fail_without_partial_output() {
    let (status, body) = get("/people/broken.html", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body.contains("No view available for this resource"),
        "{body}"
    );
    assert!(!body.contains("partial output"), "{body}");
}

static THING: TypeDescriptor = TypeDescriptor::new("app.Thing");

struct Thing;

impl Model for Thing {
    fn descriptor(&self) -> &'static TypeDescriptor {
        &THING
    }
}

fn thing_index(ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
    let suffixes = ctx.settings().view_suffixes.join(" ");
    ctx.write(format!("thing {suffixes}"))
}

fn thing_page(ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
    let thing: ModelRef = Arc::new(Thing);
    ctx.write("[")?;
    ctx.view(Some(thing), "index")?;
    ctx.write("]")
}

#[tokio::test]
async fn nested_views_use_the_served_view_settings() {
    let settings = ViewSettings {
        view_suffixes: vec![".ssp".to_string()],
        ..ViewSettings::default()
    };
    let registry = PageRegistry::new()
        .with_page("/app/Thing.index.ssp", ContextPage::new(thing_index))
        .with_page("/things/show.ssp", ContextPage::new(thing_page));
    let app = build_router(RenderState::new(Arc::new(registry), settings));

    let request = Request::get("/things/show.ssp")
        .body(Body::empty())
        .expect("request should build");
    let response = app.oneshot(request).await.expect("router should respond");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"[thing .ssp]");
}

#[test]
fn candidate_listing_is_prefix_major() {
    let settings = ViewSettings {
        view_suffixes: vec![".html".to_string(), ".htm".to_string()],
        ..ViewSettings::default()
    };
    let paths = candidate_paths(
        &settings.view_prefixes,
        &settings.view_suffixes,
        &PERSON.path_segment(),
        "card",
    );

    insta::assert_snapshot!(paths.join("\n"), @r"
    /WEB-INF/app/Person.card.html
    /WEB-INF/app/Person.card.htm
    /app/Person.card.html
    /app/Person.card.htm
    ");
}
