//! Derivative-free minimisation with the Nelder–Mead simplex

use serde::{Deserialize, Serialize};

/// Outcome of a simplex run
#[derive(Debug, Clone)]
pub struct SimplexResult {
    pub x: Vec<f64>,
    pub fx: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Nelder–Mead minimiser with standard coefficients
/// (reflection 1, expansion 2, contraction ½, shrink ½)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NelderMead {
    pub max_iter: usize,
    /// Convergence tolerance on simplex vertex spread
    pub x_tol: f64,
    /// Convergence tolerance on objective spread
    pub f_tol: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iter: 5000,
            x_tol: 1e-6,
            f_tol: 1e-8,
        }
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Minimise `f` starting from `x0`. Non-finite objective values are
    /// treated as `+inf`, so the simplex moves away from them.
    pub fn minimize<F>(&self, f: F, x0: &[f64]) -> SimplexResult
    where
        F: Fn(&[f64]) -> f64,
    {
        let n = x0.len();
        let eval = |x: &[f64]| {
            let v = f(x);
            if v.is_finite() {
                v
            } else {
                f64::INFINITY
            }
        };

        if n == 0 {
            return SimplexResult {
                x: Vec::new(),
                fx: eval(x0),
                iterations: 0,
                converged: true,
            };
        }

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        simplex.push(x0.to_vec());
        for i in 0..n {
            let mut vertex = x0.to_vec();
            vertex[i] = if vertex[i] != 0.0 {
                vertex[i] * 1.05
            } else {
                0.00025
            };
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iter {
            Self::order(&mut simplex, &mut values);

            if self.has_converged(&simplex, &values) {
                converged = true;
                break;
            }
            iterations += 1;

            let centroid = Self::centroid(&simplex[..n]);
            let worst = simplex[n].clone();
            let point = |coef: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&worst)
                    .map(|(c, w)| c + coef * (c - w))
                    .collect()
            };

            let reflected = point(REFLECT);
            let f_reflected = eval(&reflected);

            if f_reflected < values[0] {
                let expanded = point(REFLECT * EXPAND);
                let f_expanded = eval(&expanded);
                if f_expanded < f_reflected {
                    simplex[n] = expanded;
                    values[n] = f_expanded;
                } else {
                    simplex[n] = reflected;
                    values[n] = f_reflected;
                }
                continue;
            }

            if f_reflected < values[n - 1] {
                simplex[n] = reflected;
                values[n] = f_reflected;
                continue;
            }

            let accepted = if f_reflected < values[n] {
                let outside = point(CONTRACT * REFLECT);
                let f_outside = eval(&outside);
                (f_outside <= f_reflected).then_some((outside, f_outside))
            } else {
                let inside = point(-CONTRACT);
                let f_inside = eval(&inside);
                (f_inside < values[n]).then_some((inside, f_inside))
            };

            match accepted {
                Some((x, fx)) => {
                    simplex[n] = x;
                    values[n] = fx;
                }
                None => {
                    let best = simplex[0].clone();
                    for j in 1..=n {
                        for (xj, b) in simplex[j].iter_mut().zip(&best) {
                            *xj = b + SHRINK * (*xj - b);
                        }
                        values[j] = eval(&simplex[j]);
                    }
                }
            }
        }

        Self::order(&mut simplex, &mut values);
        SimplexResult {
            x: simplex.swap_remove(0),
            fx: values[0],
            iterations,
            converged,
        }
    }

    fn order(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
        let mut idx: Vec<usize> = (0..values.len()).collect();
        idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        *simplex = idx.iter().map(|&i| simplex[i].clone()).collect();
        *values = idx.iter().map(|&i| values[i]).collect();
    }

    fn centroid(vertices: &[Vec<f64>]) -> Vec<f64> {
        let n = vertices[0].len();
        let mut c = vec![0.0; n];
        for v in vertices {
            for (ci, vi) in c.iter_mut().zip(v) {
                *ci += vi;
            }
        }
        let k = vertices.len() as f64;
        c.iter_mut().for_each(|ci| *ci /= k);
        c
    }

    fn has_converged(&self, simplex: &[Vec<f64>], values: &[f64]) -> bool {
        if !values[0].is_finite() {
            return false;
        }
        let f_spread = values[1..]
            .iter()
            .map(|v| (v - values[0]).abs())
            .fold(0.0, f64::max);
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        f_spread <= self.f_tol && x_spread <= self.x_tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_bowl() {
        let f = |x: &[f64]| (x[0] - 1.5).powi(2) + 3.0 * (x[1] + 0.5).powi(2);
        let result = NelderMead::default().minimize(f, &[0.0, 0.0]);
        assert!(result.converged);
        assert!((result.x[0] - 1.5).abs() < 1e-4);
        assert!((result.x[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_rosenbrock() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let result = NelderMead::default().minimize(f, &[-1.2, 1.0]);
        assert!(result.converged);
        assert!((result.x[0] - 1.0).abs() < 1e-3);
        assert!((result.x[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_iteration_cap_reports_no_convergence() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let result = NelderMead::default().with_max_iter(3).minimize(f, &[-1.2, 1.0]);
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn test_infinite_region_avoided() {
        let f = |x: &[f64]| {
            if x[0] < 0.0 {
                f64::NAN
            } else {
                (x[0] - 2.0).powi(2)
            }
        };
        let result = NelderMead::default().minimize(f, &[0.5]);
        assert!(result.converged);
        assert!((result.x[0] - 2.0).abs() < 1e-4);
    }
}
