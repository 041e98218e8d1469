use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures::stream::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::print::models::{PrintRequest, PrintResult};
use crate::print::protocol::PrintReporter;
use crate::state::AppState;
use crate::ErrorResponse;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendAccepted {
    pub accepted: bool,
    pub job_id: Uuid,
}

#[utoipa::path(
    post,
    path = "/api/print",
    tag = "Print Service",
    request_body = PrintRequest,
    responses(
        (status = 200, description = "Outcome of the print or PDF job", body = PrintResult),
        (status = 400, description = "Malformed request body", body = ErrorResponse)
    )
)]
pub async fn invoke_print(
    state: web::Data<AppState>,
    body: web::Json<PrintRequest>,
) -> impl Responder {
    let result = state.service.invoke(body.into_inner()).await;
    HttpResponse::Ok().json(result)
}

#[utoipa::path(
    post,
    path = "/api/print/send",
    tag = "Print Service",
    request_body = PrintRequest,
    responses(
        (status = 202, description = "Job accepted; progress is published on /api/print/events", body = SendAccepted),
        (status = 400, description = "Malformed request body", body = ErrorResponse)
    )
)]
pub async fn send_print(
    state: web::Data<AppState>,
    body: web::Json<PrintRequest>,
) -> impl Responder {
    let reporter: Arc<dyn PrintReporter> = Arc::new(state.reporter.clone());
    let ticket = state.service.send(body.into_inner(), reporter);
    log::debug!("Queued fire-and-forget print job {}", ticket.job_id);

    HttpResponse::Accepted().json(SendAccepted {
        accepted: true,
        job_id: ticket.job_id,
    })
}

#[utoipa::path(
    get,
    path = "/api/print/events",
    tag = "Print Service",
    responses(
        (status = 200, description = "Server-sent stream of print lifecycle events", body = String, content_type = "text/event-stream")
    )
)]
pub async fn print_events(state: web::Data<AppState>) -> impl Responder {
    let stream = BroadcastStream::new(state.reporter.subscribe());

    let ready = "event: ready\ndata: /api/print/events\n\n".to_string();
    let event_stream = futures::stream::once(async move {
        Ok::<_, std::io::Error>(web::Bytes::from(ready))
    })
    .chain(stream.map(|message| {
        let frame = match message {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => format!("data: {}\n\n", json),
                Err(e) => {
                    log::error!("Failed to serialize print event: {}", e);
                    "event: error\ndata: serialization failed\n\n".to_string()
                }
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                log::warn!("Event subscriber lagged; {} print events skipped", skipped);
                format!("event: lagged\ndata: {}\n\n", skipped)
            }
        };
        Ok::<_, std::io::Error>(web::Bytes::from(frame))
    }));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .streaming(event_stream)
}

/// Malformed JSON bodies answer with the service's `ErrorResponse`.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = err.to_string();
    log::warn!("Rejected print request body: {}", message);
    let response = HttpResponse::BadRequest().json(ErrorResponse::bad_request(&message));
    InternalError::from_response(err, response).into()
}

/// Configure print routes, relative to the enclosing `/api` scope.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/print").route(web::post().to(invoke_print)))
        .service(web::resource("/print/send").route(web::post().to(send_print)))
        .service(web::resource("/print/events").route(web::get().to(print_events)));
}
