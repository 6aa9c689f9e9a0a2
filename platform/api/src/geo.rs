//! Ellipsoidal distance between two coordinate pairs.
//!
//! Distances are computed on the WGS-84 ellipsoid with Vincenty's inverse
//! formula. Stride counts are derived from an average stride of 0.74 m.

/// WGS-84 semi-major axis in meters.
const WGS84_A: f64 = 6_378_137.0;
/// WGS-84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS-84 semi-minor axis in meters.
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

/// Average stride length in meters.
const STRIDE_METERS: f64 = 0.74;

const CONVERGENCE: f64 = 1e-12;
const MAX_ITERATIONS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Distance {
    /// Whole meters between the two points.
    pub meters: u64,
    /// Whole strides between the two points.
    pub strides: u64,
}

/// Distance between two coordinate pairs.
///
/// Returns `None` when either pair has a missing or non-finite component, or
/// when the geodesic solution does not converge (near-antipodal points).
/// Distance is undefined in those cases, not zero.
pub fn distance(
    from: (Option<f64>, Option<f64>),
    to: (Option<f64>, Option<f64>),
) -> Option<Distance> {
    let (Some(lat1), Some(lon1)) = from else {
        return None;
    };
    let (Some(lat2), Some(lon2)) = to else {
        return None;
    };

    let meters = vincenty_inverse(lat1, lon1, lat2, lon2)?;

    // Whole meters first, then whole strides, matching the published values.
    let meters = meters.trunc() as u64;
    let strides = (meters as f64 / STRIDE_METERS).trunc() as u64;

    Some(Distance { meters, strides })
}

/// Vincenty's inverse formula on the WGS-84 ellipsoid.
fn vincenty_inverse(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<f64> {
    if !lat1.is_finite() || !lon1.is_finite() || !lat2.is_finite() || !lon2.is_finite() {
        return None;
    }

    let l = (lon2 - lon1).to_radians();
    let u1 = ((1.0 - WGS84_F) * lat1.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * lat2.to_radians().tan()).atan();

    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    let mut sin_sigma = 0.0;
    let mut cos_sigma = 0.0;
    let mut sigma = 0.0;
    let mut cos_sq_alpha = 0.0;
    let mut cos_2sigma_m = 0.0;

    let mut converged = false;
    for _ in 0..MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();

        sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // Coincident points.
            return Some(0.0);
        }

        cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        sigma = sin_sigma.atan2(cos_sigma);

        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        cos_2sigma_m = if cos_sq_alpha == 0.0 {
            // Equatorial line.
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        };

        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let lambda_prev = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if (lambda - lambda_prev).abs() < CONVERGENCE {
            converged = true;
            break;
        }
    }

    if !converged {
        return None;
    }

    let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
    let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));

    let delta_sigma = b
        * sin_sigma
        * (cos_2sigma_m
            + b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                    - b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

    Some(WGS84_B * a * (sigma - delta_sigma))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_distance() {
        let d = distance((Some(0.0), Some(0.0)), (Some(1.0), Some(1.0))).unwrap();
        assert_eq!(d.meters, 156_899);
        assert_eq!(d.strides, 212_025);
    }

    #[test]
    fn coincident_points() {
        let d = distance((Some(52.37), Some(4.89)), (Some(52.37), Some(4.89))).unwrap();
        assert_eq!(d.meters, 0);
        assert_eq!(d.strides, 0);
    }

    #[test]
    fn missing_component_is_undefined() {
        assert_eq!(distance((None, Some(4.89)), (Some(52.37), Some(4.89))), None);
        assert_eq!(distance((Some(52.37), Some(4.89)), (Some(52.37), None)), None);
    }

    #[test]
    fn non_finite_component_is_undefined() {
        assert_eq!(
            distance((Some(f64::NAN), Some(4.89)), (Some(52.37), Some(4.89))),
            None
        );
        assert_eq!(
            distance((Some(52.37), Some(f64::INFINITY)), (Some(52.37), Some(4.89))),
            None
        );
    }

    #[test]
    fn meridian_arc() {
        // One degree of latitude along the prime meridian is ~110.57 km.
        let d = distance((Some(0.0), Some(0.0)), (Some(1.0), Some(0.0))).unwrap();
        assert!((110_000..111_500).contains(&d.meters));
    }
}
