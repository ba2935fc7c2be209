//! Adam with coupled L2 weight decay.
//!
//! Per parameter `theta` with gradient `g`, at step `t`:
//!
//! ```text
//! g     = g + lambda * theta
//! m     = beta1 * m + (1 - beta1) * g
//! v     = beta2 * v + (1 - beta2) * g^2
//! theta = theta - lr * (m / (1 - beta1^t)) / (sqrt(v / (1 - beta2^t)) + eps)
//! ```
//!
//! The decay term enters the gradient (and therefore the moment
//! estimates), unlike AdamW where it is applied to `theta` directly.
//!
//! Reference: Kingma & Ba (2014), "Adam: A Method for Stochastic Optimization"

use candle_core::backprop::GradStore;
use candle_core::{Result, Var};
use candle_nn::Optimizer;

/// Adam hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamsAdam {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    pub weight_decay: f64,
}

impl Default for ParamsAdam {
    fn default() -> Self {
        Self {
            lr: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
        }
    }
}

/// A parameter paired with its own moment accumulators.
#[derive(Debug)]
struct VarAdam {
    var: Var,
    first_moment: Var,
    second_moment: Var,
}

#[derive(Debug)]
pub struct Adam {
    vars: Vec<VarAdam>,
    step_t: usize,
    params: ParamsAdam,
}

impl Adam {
    pub fn params(&self) -> &ParamsAdam {
        &self.params
    }

    /// Number of completed update steps.
    pub fn step_count(&self) -> usize {
        self.step_t
    }
}

impl Optimizer for Adam {
    type Config = ParamsAdam;

    fn new(vars: Vec<Var>, params: ParamsAdam) -> Result<Self> {
        let vars = vars
            .into_iter()
            .filter(|var| var.dtype().is_float())
            .map(|var| {
                let dtype = var.dtype();
                let shape = var.shape();
                let device = var.device();
                let first_moment = Var::zeros(shape, dtype, device)?;
                let second_moment = Var::zeros(shape, dtype, device)?;
                Ok(VarAdam {
                    var,
                    first_moment,
                    second_moment,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            vars,
            step_t: 0,
            params,
        })
    }

    fn learning_rate(&self) -> f64 {
        self.params.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.params.lr = lr;
    }

    fn step(&mut self, grads: &GradStore) -> Result<()> {
        self.step_t += 1;
        let ParamsAdam {
            lr,
            beta1,
            beta2,
            eps,
            weight_decay,
        } = self.params;
        let scale_m = 1f64 / (1f64 - beta1.powi(self.step_t as i32));
        let scale_v = 1f64 / (1f64 - beta2.powi(self.step_t as i32));

        for var in &self.vars {
            let theta = &var.var;
            let m = &var.first_moment;
            let v = &var.second_moment;
            let Some(g) = grads.get(theta) else {
                continue;
            };

            let g = if weight_decay != 0.0 {
                (g + (theta.as_tensor() * weight_decay)?)?
            } else {
                g.clone()
            };
            let next_m = ((m.as_tensor() * beta1)? + (&g * (1.0 - beta1))?)?;
            let next_v = ((v.as_tensor() * beta2)? + (g.sqr()? * (1.0 - beta2))?)?;
            let m_hat = (&next_m * scale_m)?;
            let v_hat = (&next_v * scale_v)?;
            let adjusted_grad = (m_hat / (v_hat.sqrt()? + eps)?)?;
            let next_theta = (theta.as_tensor() - (adjusted_grad * lr)?)?;
            m.set(&next_m)?;
            v.set(&next_v)?;
            theta.set(&next_theta)?;
        }
        Ok(())
    }
}
