pub mod osrm;

use crate::error::Result;
use crate::models::{Job, Location, SquareMatrix, UserDistance, UserDuration, Vehicle};

/// Duration and distance matrices returned by a routing backend.
pub struct RoutingMatrices {
    pub durations: SquareMatrix<UserDuration>,
    pub distances: SquareMatrix<UserDistance>,
}

/// Routing wrapper consumed by the loader: one backend per profile.
/// Dispatch is by enum, mirroring how provider selection was already done
/// in the matrix layer this replaces.
#[derive(Debug)]
pub enum Router {
    Osrm(osrm::OsrmRouter),
}

impl Router {
    pub fn osrm(base_url: String, profile: String) -> Self {
        Router::Osrm(osrm::OsrmRouter::new(base_url, profile))
    }

    pub fn profile(&self) -> &str {
        match self {
            Router::Osrm(r) => &r.profile,
        }
    }

    /// Full square matrices over the given locations.
    pub async fn get_matrices(&self, locations: &[Location]) -> Result<RoutingMatrices> {
        match self {
            Router::Osrm(r) => r.get_matrices(locations).await,
        }
    }

    /// Fill only the entries needed by the declared vehicle step sequences,
    /// one route request per vehicle, and capture per-vehicle geometries.
    pub async fn get_sparse_matrices(
        &self,
        locations: &[Location],
        vehicles: &[Vehicle],
        jobs: &[Job],
    ) -> Result<(RoutingMatrices, Vec<String>)> {
        match self {
            Router::Osrm(r) => r.get_sparse_matrices(locations, vehicles, jobs).await,
        }
    }

    /// Polyline for an ordered list of step coordinates.
    pub async fn route_geometry(&self, coords: &[[f64; 2]]) -> Result<String> {
        match self {
            Router::Osrm(r) => r.route_geometry(coords).await,
        }
    }
}
