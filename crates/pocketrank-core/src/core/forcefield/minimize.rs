/// Stopping criteria for [`conjugate_gradient`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizeOptions {
    pub max_iters: usize,
    /// Converged once every gradient component is below this magnitude.
    pub grad_tolerance: f64,
    /// Converged once an accepted step lowers the energy by less than this.
    pub energy_tolerance: f64,
    /// Largest displacement of any coordinate in one line-search trial.
    pub max_step: f64,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            grad_tolerance: 1e-4,
            energy_tolerance: 1e-6,
            max_step: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizeResult {
    pub energy: f64,
    pub iterations: usize,
    pub converged: bool,
}

const ARMIJO_C1: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 40;

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

/// Polak-Ribiere nonlinear conjugate gradient with Armijo backtracking.
///
/// `objective(x, grad)` returns the energy at `x` and writes its gradient.
/// `x` is updated in place to the best point found.
pub fn conjugate_gradient<F>(x: &mut [f64], mut objective: F, options: &MinimizeOptions) -> MinimizeResult
where
    F: FnMut(&[f64], &mut [f64]) -> f64,
{
    let n = x.len();
    let mut grad = vec![0.0; n];
    let mut energy = objective(x, &mut grad);
    let mut direction: Vec<f64> = grad.iter().map(|g| -g).collect();
    let mut trial = vec![0.0; n];
    let mut trial_grad = vec![0.0; n];

    for iteration in 0..options.max_iters {
        if max_abs(&grad) < options.grad_tolerance {
            return MinimizeResult {
                energy,
                iterations: iteration,
                converged: true,
            };
        }

        let mut slope = dot(&grad, &direction);
        if slope >= 0.0 {
            for (d, g) in direction.iter_mut().zip(&grad) {
                *d = -g;
            }
            slope = -dot(&grad, &grad);
        }

        let longest = max_abs(&direction);
        let mut step = if longest > options.max_step {
            options.max_step / longest
        } else {
            1.0
        };

        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            for ((t, xi), d) in trial.iter_mut().zip(x.iter()).zip(&direction) {
                *t = xi + step * d;
            }
            let e = objective(&trial, &mut trial_grad);
            if e.is_finite() && e <= energy + ARMIJO_C1 * step * slope {
                accepted = Some(e);
                break;
            }
            step *= 0.5;
        }

        let Some(new_energy) = accepted else {
            // No downhill step along the steepest direction either: stuck.
            return MinimizeResult {
                energy,
                iterations: iteration + 1,
                converged: false,
            };
        };

        let gg = dot(&grad, &grad);
        let beta = if gg > 0.0 {
            let num: f64 = trial_grad
                .iter()
                .zip(&grad)
                .map(|(gn, go)| gn * (gn - go))
                .sum();
            (num / gg).max(0.0)
        } else {
            0.0
        };
        for (d, g) in direction.iter_mut().zip(&trial_grad) {
            *d = -g + beta * *d;
        }

        let improvement = energy - new_energy;
        x.copy_from_slice(&trial);
        grad.copy_from_slice(&trial_grad);
        energy = new_energy;

        if improvement.abs() < options.energy_tolerance {
            return MinimizeResult {
                energy,
                iterations: iteration + 1,
                converged: true,
            };
        }
    }

    MinimizeResult {
        energy,
        iterations: options.max_iters,
        converged: max_abs(&grad) < options.grad_tolerance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rosenbrock(x: &[f64], g: &mut [f64]) -> f64 {
        let (a, b) = (x[0], x[1]);
        g[0] = -2.0 * (1.0 - a) - 400.0 * a * (b - a * a);
        g[1] = 200.0 * (b - a * a);
        (1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2)
    }

    #[test]
    fn minimizes_quadratic_bowl() {
        let mut x = vec![3.0, -2.0, 1.0];
        let result = conjugate_gradient(
            &mut x,
            |x, g| {
                for i in 0..3 {
                    g[i] = 2.0 * (x[i] - i as f64);
                }
                x.iter().enumerate().map(|(i, v)| (v - i as f64).powi(2)).sum()
            },
            &MinimizeOptions::default(),
        );
        assert!(result.converged);
        assert!(result.energy < 1e-6);
        assert!((x[2] - 2.0).abs() < 1e-2);
    }

    #[test]
    fn makes_progress_on_rosenbrock_within_cap() {
        let mut x = vec![-1.2, 1.0];
        let start = rosenbrock(&x, &mut [0.0; 2]);
        let options = MinimizeOptions {
            max_iters: 500,
            max_step: 1.0,
            energy_tolerance: 1e-12,
            ..Default::default()
        };
        let result = conjugate_gradient(&mut x, rosenbrock, &options);
        assert!(result.energy < start);
        assert!(result.iterations <= 500);
    }

    #[test]
    fn iteration_cap_is_respected() {
        let mut x = vec![-1.2, 1.0];
        let options = MinimizeOptions {
            max_iters: 3,
            energy_tolerance: 0.0,
            ..Default::default()
        };
        let result = conjugate_gradient(&mut x, rosenbrock, &options);
        assert!(result.iterations <= 3);
        assert!(!result.converged);
    }
}
