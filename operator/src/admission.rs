//! Admission HTTP surface (Component N): validating and mutating webhooks for both API versions.
//!
//! Grounded on `operator-k8s/src/operator.rs`'s `web_server` for the axum `Router` + graceful-
//! shutdown shape; the handlers themselves drive Component C (`validate::validate_cluster`). The
//! mutating hooks stay a no-op default, matching the distilled spec's own description of them.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use futures::FutureExt;
use k8s_openapi::api::core::v1::Secret;
use kube::core::admission::{AdmissionResponse, AdmissionReview};
use kube::{Api, ResourceExt};
use tokio::signal;

use crate::controller::Context;
use crate::crd::v1alpha1;
use crate::crd::v1beta1::TeamCity;
use crate::validate;

/// Serves the admission webhooks until the process receives a termination signal.
///
/// # Errors
/// Returns `Err` if the listener can't be bound or the server exits with an I/O error.
pub async fn serve(addr: SocketAddr, ctx: Arc<Context>) -> anyhow::Result<()> {
    let router = Router::new()
        .route("/validate/v1beta1", post(validate_v1beta1))
        .route("/validate/v1alpha1", post(validate_v1alpha1))
        .route("/mutate/v1beta1", post(mutate_noop::<TeamCity>))
        .route("/mutate/v1alpha1", post(mutate_noop::<v1alpha1::TeamCity>))
        .with_state(ctx);

    axum::Server::bind(&addr)
        .serve(router.into_make_service())
        .with_graceful_shutdown(signal::ctrl_c().map(|_| ()))
        .await?;
    Ok(())
}

async fn validate_v1beta1(
    State(ctx): State<Arc<Context>>,
    Json(review): Json<AdmissionReview<TeamCity>>,
) -> Json<AdmissionReview<TeamCity>> {
    let request = match review.request {
        Some(r) => r,
        None => return Json(AdmissionResponse::invalid("missing admission request").into_review()),
    };
    let response = AdmissionResponse::from(&request);
    let response = match request.object.as_ref() {
        Some(cluster) => respond(response, validate_with_database_secret(&ctx, cluster).await),
        None => response.deny("admission request carried no object"),
    };
    Json(response.into_review())
}

async fn validate_v1alpha1(
    State(ctx): State<Arc<Context>>,
    Json(review): Json<AdmissionReview<v1alpha1::TeamCity>>,
) -> Json<AdmissionReview<v1alpha1::TeamCity>> {
    let request = match review.request {
        Some(r) => r,
        None => return Json(AdmissionResponse::invalid("missing admission request").into_review()),
    };
    let response = AdmissionResponse::from(&request);
    let response = match request.object.as_ref() {
        Some(legacy) => match crate::crd::convert::to_hub(legacy) {
            Ok(cluster) => respond(response, validate_with_database_secret(&ctx, &cluster).await),
            Err(e) => response.deny(e.to_string()),
        },
        None => response.deny("admission request carried no object"),
    };
    Json(response.into_review())
}

/// Runs Component C's structural checks, then -- whenever the cluster references a database
/// secret -- fetches it and runs the content check too, in the same admission pass.
async fn validate_with_database_secret(ctx: &Context, cluster: &TeamCity) -> Result<Vec<validate::Warning>, validate::ValidationError> {
    let warnings = validate::validate_cluster(cluster)?;
    if cluster.database_secret_provided() {
        let namespace = cluster.namespace().unwrap_or_default();
        let secret_name = &cluster.spec.database_secret.secret;
        let api: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
        if let Ok(secret) = api.get(secret_name).await {
            validate::validate_database_secret(secret_name, &secret)?;
        }
    }
    Ok(warnings)
}

fn respond(response: AdmissionResponse, outcome: Result<Vec<validate::Warning>, validate::ValidationError>) -> AdmissionResponse {
    match outcome {
        Ok(warnings) => {
            let mut response = response;
            let messages: Vec<String> = warnings.into_iter().map(|w| w.0).collect();
            if !messages.is_empty() {
                response.warnings = Some(messages);
            }
            response
        }
        Err(e) => response.deny(e.to_string()),
    }
}

async fn mutate_noop<K: serde::de::DeserializeOwned + serde::Serialize>(
    Json(review): Json<AdmissionReview<K>>,
) -> Json<AdmissionReview<K>> {
    let response = match review.request {
        Some(request) => AdmissionResponse::from(&request),
        None => return Json(AdmissionResponse::invalid("missing admission request").into_review()),
    };
    Json(response.into_review())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respond_turns_an_error_into_a_denial() {
        let response = AdmissionResponse::invalid("placeholder");
        let response = respond(response, Err(validate::ValidationError::MissingMainMemoryRequest));
        assert!(!response.allowed);
    }

    #[test]
    fn respond_carries_warnings_through_on_success() {
        let response = AdmissionResponse::invalid("placeholder");
        let response = respond(response, Ok(vec![validate::Warning("incomplete responsibility union".to_owned())]));
        assert_eq!(response.warnings, Some(vec!["incomplete responsibility union".to_owned()]));
    }
}
