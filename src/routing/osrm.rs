use std::sync::Mutex;

use futures::future::join_all;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::models::{Job, Location, SquareMatrix, StepType, Vehicle};

use super::RoutingMatrices;

/// HTTP client for an OSRM-compatible routing server.
#[derive(Debug)]
pub struct OsrmRouter {
    pub base_url: String,
    pub profile: String,
    client: Client,
}

fn coord_string(locations: &[Location]) -> Result<String> {
    let mut parts = Vec::with_capacity(locations.len());
    for (i, loc) in locations.iter().enumerate() {
        match loc.coords() {
            Some(c) => parts.push(format!("{},{}", c[0], c[1])),
            None => {
                return Err(Error::Routing(format!(
                    "no coordinates for location at index {i}"
                )))
            }
        }
    }
    Ok(parts.join(";"))
}

fn matrix_value(value: &Value, row: usize, col: usize) -> Option<f64> {
    value.as_array()?.get(row)?.as_array()?.get(col)?.as_f64()
}

impl OsrmRouter {
    pub fn new(base_url: String, profile: String) -> Self {
        OsrmRouter {
            base_url,
            profile,
            client: Client::new(),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        trace!("GET {url}");
        let response = self
            .client
            .get(url)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| Error::Routing(format!("routing request failed: {e}")))?;

        let status = response.status();
        debug!("routing response: HTTP {status}");
        if !status.is_success() {
            error!("routing server returned HTTP {status}");
            return Err(Error::Routing(format!(
                "routing server returned HTTP {status}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Routing(format!("invalid routing response: {e}")))
    }

    pub async fn get_matrices(&self, locations: &[Location]) -> Result<RoutingMatrices> {
        let coords = coord_string(locations)?;
        let url = format!(
            "{}/table/v1/{}/{}?annotations=duration,distance",
            self.base_url, self.profile, coords
        );
        if url.len() > 8000 {
            warn!(
                "routing table URL is {} chars long, consider a self-hosted server",
                url.len()
            );
        }

        info!(
            locations = locations.len(),
            profile = %self.profile,
            "requesting travel matrices"
        );
        let json = self.get_json(&url).await?;

        let n = locations.len();
        let mut durations = SquareMatrix::new(n, 0u32);
        let mut distances = SquareMatrix::new(n, 0u32);

        for i in 0..n {
            for j in 0..n {
                let duration = matrix_value(&json["durations"], i, j);
                let distance = matrix_value(&json["distances"], i, j);
                match (duration, distance) {
                    (Some(du), Some(di)) => {
                        durations.set(i, j, du.round() as u32);
                        distances.set(i, j, di.round() as u32);
                    }
                    _ => {
                        let loc = &locations[i];
                        return Err(Error::Routing(format!(
                            "unfound route from location [{:.6},{:.6}] (index {i} to {j})",
                            loc.lon(),
                            loc.lat()
                        )));
                    }
                }
            }
        }

        Ok(RoutingMatrices {
            durations,
            distances,
        })
    }

    pub async fn get_sparse_matrices(
        &self,
        locations: &[Location],
        vehicles: &[Vehicle],
        jobs: &[Job],
    ) -> Result<(RoutingMatrices, Vec<String>)> {
        let n = locations.len();
        let matrices = Mutex::new(RoutingMatrices {
            durations: SquareMatrix::new(n, 0u32),
            distances: SquareMatrix::new(n, 0u32),
        });
        let geometries = Mutex::new(vec![String::new(); vehicles.len()]);

        // One route request per vehicle with job steps; writes to the shared
        // matrices go through the mutex. The workload is bounded by the
        // fleet size, not by search steps.
        let requests = vehicles
            .iter()
            .enumerate()
            .filter(|(_, v)| v.profile == self.profile)
            .filter_map(|(v_rank, v)| {
                let mut route_locs: Vec<Location> = Vec::with_capacity(v.steps.len());
                let mut has_job_steps = false;
                for step in &v.steps {
                    match step.step_type {
                        StepType::Start => {
                            if let Some(start) = &v.start {
                                route_locs.push(*start);
                            }
                        }
                        StepType::End => {
                            if let Some(end) = &v.end {
                                route_locs.push(*end);
                            }
                        }
                        StepType::Break => {}
                        StepType::Job => {
                            has_job_steps = true;
                            route_locs.push(jobs[step.rank].location);
                        }
                    }
                }
                (has_job_steps && route_locs.len() >= 2).then_some((v_rank, route_locs))
            })
            .map(|(v_rank, route_locs)| {
                let matrices = &matrices;
                let geometries = &geometries;
                async move {
                    let coords = coord_string(&route_locs)?;
                    let url = format!(
                        "{}/route/v1/{}/{}?overview=full&steps=false",
                        self.base_url, self.profile, coords
                    );
                    let json = self.get_json(&url).await?;

                    let route = json["routes"].get(0).ok_or_else(|| {
                        Error::Routing(format!(
                            "no route found for vehicle at rank {v_rank}"
                        ))
                    })?;

                    let legs = route["legs"].as_array().ok_or_else(|| {
                        Error::Routing("malformed route response: missing legs".to_string())
                    })?;
                    if legs.len() + 1 != route_locs.len() {
                        return Err(Error::Routing(
                            "malformed route response: leg count mismatch".to_string(),
                        ));
                    }

                    {
                        let mut m = matrices.lock().unwrap();
                        for (leg_rank, leg) in legs.iter().enumerate() {
                            let from = route_locs[leg_rank].index();
                            let to = route_locs[leg_rank + 1].index();
                            let duration =
                                leg["duration"].as_f64().unwrap_or_default().round() as u32;
                            let distance =
                                leg["distance"].as_f64().unwrap_or_default().round() as u32;
                            m.durations.set(from, to, duration);
                            m.distances.set(from, to, distance);
                        }
                    }

                    if let Some(geometry) = route["geometry"].as_str() {
                        geometries.lock().unwrap()[v_rank] = geometry.to_string();
                    }

                    Ok(())
                }
            });

        for result in join_all(requests).await {
            result?;
        }

        Ok((
            matrices.into_inner().unwrap(),
            geometries.into_inner().unwrap(),
        ))
    }

    pub async fn route_geometry(&self, coords: &[[f64; 2]]) -> Result<String> {
        let coord_str = coords
            .iter()
            .map(|c| format!("{},{}", c[0], c[1]))
            .collect::<Vec<_>>()
            .join(";");
        let url = format!(
            "{}/route/v1/{}/{}?overview=full&steps=false",
            self.base_url, self.profile, coord_str
        );
        let json = self.get_json(&url).await?;

        json["routes"]
            .get(0)
            .and_then(|r| r["geometry"].as_str())
            .map(|g| g.to_string())
            .ok_or_else(|| Error::Routing("no geometry in route response".to_string()))
    }
}
