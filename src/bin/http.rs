#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use capacity_planner::{PlanningWorkbook, http_api, persistence::load_workbook_from_json};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr: SocketAddr = std::env::var("CAPACITY_PLANNER_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;

    let workbook = match std::env::var("CAPACITY_PLANNER_WORKBOOK") {
        Ok(path) => load_workbook_from_json(&path)?,
        Err(_) => PlanningWorkbook::new(),
    };

    println!("capacity-planner HTTP API listening on http://{addr}");
    http_api::serve(addr, workbook).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
