//! Pure energy functions and their derivatives. Distances in Angstroms,
//! energies in kcal/mol.

#[inline]
pub fn lennard_jones_12_6(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    if dist < 1e-6 {
        return 1e10;
    }
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    well_depth * (rho12 - 2.0 * rho6)
}

/// dE/dr of [`lennard_jones_12_6`].
#[inline]
pub fn lennard_jones_12_6_derivative(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    if dist < 1e-6 {
        return 0.0;
    }
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    12.0 * well_depth * (rho6 - rho12) / dist
}

#[inline]
pub fn harmonic(value: f64, equilibrium: f64, force_constant: f64) -> f64 {
    let delta = value - equilibrium;
    0.5 * force_constant * delta * delta
}

#[inline]
pub fn harmonic_derivative(value: f64, equilibrium: f64, force_constant: f64) -> f64 {
    force_constant * (value - equilibrium)
}

/// Fourier coefficients `(c0, c1, c2)` of the UFF general angle term so that
/// `E = K (c0 + c1 cos t + c2 cos 2t)` has its minimum at `theta0`.
#[inline]
pub fn angle_fourier_coefficients(theta0_radians: f64) -> (f64, f64, f64) {
    let sin0 = theta0_radians.sin();
    let cos0 = theta0_radians.cos();
    let c2 = 1.0 / (4.0 * sin0 * sin0);
    let c1 = -4.0 * c2 * cos0;
    let c0 = c2 * (2.0 * cos0 * cos0 + 1.0);
    (c0, c1, c2)
}

/// Angle energy as a function of `cos t`; `linear` selects `K (1 + cos t)`.
#[inline]
pub fn cosine_angle(cos_theta: f64, k: f64, coefficients: (f64, f64, f64), linear: bool) -> f64 {
    if linear {
        return k * (1.0 + cos_theta);
    }
    let (c0, c1, c2) = coefficients;
    let cos2 = 2.0 * cos_theta * cos_theta - 1.0;
    k * (c0 + c1 * cos_theta + c2 * cos2)
}

/// dE/d(cos t) of [`cosine_angle`].
#[inline]
pub fn cosine_angle_derivative(cos_theta: f64, k: f64, coefficients: (f64, f64, f64), linear: bool) -> f64 {
    if linear {
        return k;
    }
    let (_, c1, c2) = coefficients;
    k * (c1 + 4.0 * c2 * cos_theta)
}

/// Chebyshev polynomial `T_n(x)` and its derivative, so that
/// `cos(n phi) = T_n(cos phi)`.
#[inline]
pub fn chebyshev(n: u32, x: f64) -> (f64, f64) {
    let (mut t_prev, mut t) = (1.0, x);
    let (mut u_prev, mut u) = (1.0, 2.0 * x);
    if n == 0 {
        return (1.0, 0.0);
    }
    for _ in 1..n {
        let t_next = 2.0 * x * t - t_prev;
        t_prev = t;
        t = t_next;
        let u_next = 2.0 * x * u - u_prev;
        u_prev = u;
        u = u_next;
    }
    // u now holds U_n; the derivative of T_n is n * U_{n-1}.
    (t, n as f64 * u_prev)
}

/// UFF torsion `E = V/2 [1 - cos(n phi0) cos(n phi)]` as a function of `cos phi`.
#[inline]
pub fn torsion(cos_phi: f64, barrier: f64, periodicity: u32, cos_n_phi0: f64) -> f64 {
    let (t, _) = chebyshev(periodicity, cos_phi);
    0.5 * barrier * (1.0 - cos_n_phi0 * t)
}

/// dE/d(cos phi) of [`torsion`].
#[inline]
pub fn torsion_derivative(cos_phi: f64, barrier: f64, periodicity: u32, cos_n_phi0: f64) -> f64 {
    let (_, dt) = chebyshev(periodicity, cos_phi);
    -0.5 * barrier * cos_n_phi0 * dt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn numeric_derivative(f: impl Fn(f64) -> f64, x: f64) -> f64 {
        let h = 1e-6;
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    #[test]
    fn lennard_jones_at_minimum_distance_returns_negative_well_depth() {
        let energy = lennard_jones_12_6(2.0, 2.0, 10.0);
        assert!(f64_approx_equal(energy, -10.0));
        assert!(f64_approx_equal(lennard_jones_12_6_derivative(2.0, 2.0, 10.0), 0.0));
    }

    #[test]
    fn lennard_jones_at_very_small_distance_returns_large_positive_energy() {
        let energy = lennard_jones_12_6(1e-7, 2.0, 10.0);
        assert!(f64_approx_equal(energy, 1e10));
    }

    #[test]
    fn lennard_jones_derivative_matches_finite_difference() {
        let analytic = lennard_jones_12_6_derivative(1.8, 2.0, 0.3);
        let numeric = numeric_derivative(|r| lennard_jones_12_6(r, 2.0, 0.3), 1.8);
        assert!((analytic - numeric).abs() < 1e-5);
    }

    #[test]
    fn harmonic_is_zero_at_equilibrium() {
        assert!(f64_approx_equal(harmonic(1.5, 1.5, 700.0), 0.0));
        assert!(f64_approx_equal(harmonic(1.6, 1.5, 700.0), 3.5));
        assert!(f64_approx_equal(harmonic_derivative(1.6, 1.5, 700.0), 70.0));
    }

    #[test]
    fn cosine_angle_has_minimum_at_natural_angle() {
        let theta0 = 109.47f64.to_radians();
        let coeffs = angle_fourier_coefficients(theta0);
        let at_min = cosine_angle(theta0.cos(), 100.0, coeffs, false);
        assert!(at_min.abs() < 1e-9);
        assert!(cosine_angle((theta0 + 0.1).cos(), 100.0, coeffs, false) > at_min);
        assert!(cosine_angle_derivative(theta0.cos(), 100.0, coeffs, false).abs() < 1e-9);
    }

    #[test]
    fn linear_angle_is_minimal_at_pi() {
        assert!(f64_approx_equal(cosine_angle(PI.cos(), 50.0, (0.0, 0.0, 0.0), true), 0.0));
        assert!(cosine_angle(0.0, 50.0, (0.0, 0.0, 0.0), true) > 0.0);
    }

    #[test]
    fn chebyshev_reproduces_multiple_angle_cosines() {
        for n in [1, 2, 3, 6] {
            for phi in [0.1, 0.7, 1.9, 2.8] {
                let (t, dt) = chebyshev(n, f64::cos(phi));
                assert!((t - (n as f64 * phi).cos()).abs() < 1e-9);
                let numeric = numeric_derivative(|x| chebyshev(n, x).0, phi.cos());
                assert!((dt - numeric).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn sp3_torsion_prefers_staggered() {
        // n = 3, phi0 = 180 deg: cos(n phi0) = -1.
        let staggered = torsion((PI / 3.0).cos(), 2.0, 3, -1.0);
        let eclipsed = torsion(0.0f64.cos(), 2.0, 3, -1.0);
        assert!(f64_approx_equal(staggered, 0.0));
        assert!(f64_approx_equal(eclipsed, 2.0));
    }

    #[test]
    fn torsion_derivative_matches_finite_difference() {
        let c = 0.3;
        let analytic = torsion_derivative(c, 5.0, 2, 1.0);
        let numeric = numeric_derivative(|x| torsion(x, 5.0, 2, 1.0), c);
        assert!((analytic - numeric).abs() < 1e-5);
    }
}
