//! The horizontal mesh of a model grid and the lookup of the grid cell closest to a station.

use crate::grid::error::GridError;
use crate::types::bounding_box::BoundingBox;
use haversine::{distance, Location as HaversineLocation, Units};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Great-circle length of one degree on the sphere `haversine` uses.
const KM_PER_DEGREE: f64 = 6371.0 * std::f64::consts::PI / 180.0;

/// A mesh point as stored in the R-tree.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MeshPoint {
    latitude: f64,
    longitude: f64,
    j: usize,
    i: usize,
}

impl RTreeObject for MeshPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.latitude, self.longitude])
    }
}

impl PointDistance for MeshPoint {
    /// Squared Euclidean distance in degrees. Only used to walk candidates outward; the
    /// final ranking is by great-circle distance.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.latitude - point[0];
        let dy = self.longitude - point[1];
        dx * dx + dy * dy
    }
}

/// The grid cell chosen for a station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    /// Row index (`south_north`).
    pub j: usize,
    /// Column index (`west_east`).
    pub i: usize,
    pub latitude: f64,
    pub longitude: f64,
    /// Great-circle distance between the station and the cell centre.
    pub distance_km: f64,
}

/// Two-dimensional latitude/longitude mesh, stored row-major as `(ny, nx)`.
#[derive(Debug, Clone)]
pub struct Mesh {
    ny: usize,
    nx: usize,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    extent: BoundingBox,
    /// Cosine of the mesh latitude farthest from the equator: one degree of separation is
    /// at least this many degrees of arc anywhere on the mesh.
    min_cos: f64,
    tree: RTree<MeshPoint>,
}

impl Mesh {
    pub fn new(
        ny: usize,
        nx: usize,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
    ) -> Result<Self, GridError> {
        if latitudes.len() != ny * nx || longitudes.len() != ny * nx {
            return Err(GridError::MeshShape {
                ny,
                nx,
                lats: latitudes.len(),
                lons: longitudes.len(),
            });
        }
        let extent =
            BoundingBox::from_points(&latitudes, &longitudes).ok_or(GridError::EmptyMesh)?;

        let points: Vec<MeshPoint> = latitudes
            .iter()
            .zip(&longitudes)
            .enumerate()
            .filter(|(_, (lat, lon))| lat.is_finite() && lon.is_finite())
            .map(|(k, (&latitude, &longitude))| MeshPoint {
                latitude,
                longitude,
                j: k / nx,
                i: k % nx,
            })
            .collect();
        let tree = RTree::bulk_load(points);
        let polar = extent.min_lat.abs().max(extent.max_lat.abs()).min(89.0);
        let min_cos = polar.to_radians().cos();

        Ok(Self {
            ny,
            nx,
            latitudes,
            longitudes,
            extent,
            min_cos,
            tree,
        })
    }

    /// Builds a regular mesh from 1-D latitude and longitude axes.
    pub fn regular(latitudes: &[f64], longitudes: &[f64]) -> Result<Self, GridError> {
        let (ny, nx) = (latitudes.len(), longitudes.len());
        let mut lats = Vec::with_capacity(ny * nx);
        let mut lons = Vec::with_capacity(ny * nx);
        for &lat in latitudes {
            for &lon in longitudes {
                lats.push(lat);
                lons.push(lon);
            }
        }
        Self::new(ny, nx, lats, lons)
    }

    /// `(ny, nx)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    pub fn extent(&self) -> BoundingBox {
        self.extent
    }

    pub fn coordinates(&self, j: usize, i: usize) -> Option<(f64, f64)> {
        if j >= self.ny || i >= self.nx {
            return None;
        }
        let k = j * self.nx + i;
        Some((self.latitudes[k], self.longitudes[k]))
    }

    /// The mesh point with the smallest great-circle distance to `(latitude, longitude)`.
    ///
    /// Candidates come from the R-tree in order of degree distance and are ranked with
    /// haversine; the walk stops once no farther candidate can be closer on the sphere.
    /// Ties keep the first candidate seen.
    pub fn nearest_cell(&self, latitude: f64, longitude: f64) -> Option<GridCell> {
        let query = [latitude, longitude];
        let scale = self.min_cos.min(latitude.abs().min(89.0).to_radians().cos()) * KM_PER_DEGREE;
        let mut best: Option<(&MeshPoint, f64)> = None;
        for point in self.tree.nearest_neighbor_iter(&query) {
            if let Some((_, best_km)) = best {
                let degrees = point.distance_2(&query).sqrt();
                if degrees * scale > best_km {
                    break;
                }
            }
            let km = great_circle_km(latitude, longitude, point.latitude, point.longitude);
            if best.map_or(true, |(_, best_km)| km < best_km) {
                best = Some((point, km));
            }
        }
        let (point, distance_km) = best?;
        Some(GridCell {
            j: point.j,
            i: point.i,
            latitude: point.latitude,
            longitude: point.longitude,
            distance_km,
        })
    }
}

fn great_circle_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    distance(
        HaversineLocation {
            latitude: lat1,
            longitude: lon1,
        },
        HaversineLocation {
            latitude: lat2,
            longitude: lon2,
        },
        Units::Kilometers,
    )
}
