use crate::config::SolveConfig;
use crate::data::{SchedulingInput, SchedulingOutput};
use crate::solver;
use axum::{Json, Router, routing::post};
use log::error;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub input: SchedulingInput,
    #[serde(default)]
    pub config: SolveConfig,
}

async fn solve_handler(Json(request): Json<SolveRequest>) -> Json<SchedulingOutput> {
    match solver::solve(&request.input, &request.config) {
        Ok(output) => Json(output),
        Err(e) => {
            error!("Rejected configuration: {}", e);
            Json(SchedulingOutput::config_error())
        }
    }
}

pub fn router() -> Router {
    Router::new().route("/v1/timetable/solve", post(solve_handler))
}

pub async fn run_server() {
    let app = router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080")
        .await
        .unwrap();

    println!("Server running at http://{}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
