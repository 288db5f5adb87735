#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "date,longitude,latitude,accident_severity,number_of_vehicles,number_of_casualties,road_type,speed_limit,weather_conditions,light_conditions";
pub const ROW: &str = "2024-01-01,-0.1276,51.5074,2,2,1,Single carriageway,30,Fine without high winds,Daylight: Street light present";

/// Write `header` plus `rows` copies of the example row into `dir/name`.
pub fn write_csv(dir: &Path, name: &str, header: &str, rows: usize) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path)?;
    writeln!(f, "{header}")?;
    for _ in 0..rows {
        writeln!(f, "{ROW}")?;
    }
    Ok(path)
}

/// The full header with one column left out.
pub fn header_without(column: &str) -> String {
    HEADER
        .split(',')
        .filter(|c| *c != column)
        .collect::<Vec<_>>()
        .join(",")
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: axum::Router) -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}"))
}
