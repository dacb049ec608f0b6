use std::{collections::HashSet, sync::Arc};

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use metrics_util::debugging::DebuggingRecorder;
use tower::ServiceExt;
use vista::{
    application::{context::RenderContext, error::RenderError},
    config::ViewSettings,
    domain::types::{Model, ModelRef, TypeDescriptor},
    infra::{
        http::{PageRegistry, RenderState, build_router},
        telemetry::{
            DISPATCH_UNAVAILABLE_TOTAL, VIEW_CANDIDATES_PROBED, VIEW_MISSING_TOTAL,
            VIEW_RESOLVED_TOTAL,
        },
    },
    presentation::pages::{ContextPage, StaticPage},
};

static GADGET: TypeDescriptor = TypeDescriptor::new("shop.Gadget");

struct Gadget;

impl Model for Gadget {
    fn descriptor(&self) -> &'static TypeDescriptor {
        &GADGET
    }
}

fn gadget() -> ModelRef {
    Arc::new(Gadget)
}

fn shelf(ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
    ctx.view_index(Some(gadget()))?;
    match ctx.view(Some(gadget()), "detail") {
        Err(RenderError::NoViewTemplate { .. }) => Ok(()),
        other => other,
    }
}

#[tokio::test]
async fn rendering_emits_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let registry = PageRegistry::new()
        .with_page(
            "/shop/Gadget.index.html",
            StaticPage::new("gadget", "text/html"),
        )
        .with_page("/shelf.html", ContextPage::new(shelf));
    let app = build_router(RenderState::new(
        Arc::new(registry),
        ViewSettings::default(),
    ));

    for (uri, expected) in [
        ("/shelf.html", StatusCode::OK),
        ("/missing.html", StatusCode::NOT_FOUND),
    ] {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        assert_eq!(response.status(), expected, "{uri}");
    }

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        VIEW_RESOLVED_TOTAL,
        VIEW_MISSING_TOTAL,
        VIEW_CANDIDATES_PROBED,
        DISPATCH_UNAVAILABLE_TOTAL,
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
