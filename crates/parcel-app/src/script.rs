//! 回放脚本
//!
//! 脚本是一串步骤，按顺序驱动编辑控制器：
//!
//! ```json
//! { "steps": [
//!     { "op": "set_tool", "tool": { "tool": "draw", "kind": "Polygon" } },
//!     { "op": "input", "event": { "type": "click", "at": [10.0, 10.0] } },
//!     { "op": "merge" }
//! ] }
//! ```

use parcel_core::feature::{Feature, LayerId};
use parcel_core::geometry::LineString;
use parcel_edit::prelude::*;
use parcel_staging::ChangeStaging;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    SetTool { tool: ActiveTool },
    Input { event: InputEvent },
    Inputs { events: Vec<InputEvent> },
    Snap { enabled: bool },
    Merge,
    Delete,
    Deselect,
    Pick {
        layer: LayerId,
        #[serde(default)]
        reference: bool,
    },
    DrawLine,
}

/// 一次性操作的最终结果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Picked {
        step: usize,
        uuid: Option<String>,
        id: Option<i64>,
    },
    Line {
        step: usize,
        vertices: usize,
    },
    Failed {
        step: usize,
        reason: String,
    },
}

enum Pending {
    Feature(OneShot<Feature>),
    Line(OneShot<LineString>),
}

/// 逐步执行脚本并收集一次性操作的结果
#[derive(Default)]
pub struct Replayer {
    pending: Vec<(usize, Pending)>,
    outcomes: Vec<Outcome>,
}

impl Replayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run<S, N, R, C>(&mut self, controller: &mut DrawController<S, N, R, C>, script: &Script)
    where
        S: ChangeStaging,
        N: Notifier,
        R: LayerRegistry,
        C: SessionContext,
    {
        for (index, step) in script.steps.iter().enumerate() {
            tracing::debug!("Step {}: {:?}", index, step);
            self.apply(controller, index, step);
            self.collect();
        }

        for (step, _) in self.pending.drain(..) {
            self.outcomes.push(Outcome::Failed {
                step,
                reason: "still pending at end of script".to_string(),
            });
        }
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    fn apply<S, N, R, C>(&mut self, controller: &mut DrawController<S, N, R, C>, index: usize, step: &Step)
    where
        S: ChangeStaging,
        N: Notifier,
        R: LayerRegistry,
        C: SessionContext,
    {
        match step {
            Step::SetTool { tool } => {
                if let Err(err) = controller.set_active_tool(*tool) {
                    tracing::warn!("Step {}: {}", index, err);
                }
            }
            Step::Input { event } => controller.handle_input(event),
            Step::Inputs { events } => events.iter().for_each(|e| controller.handle_input(e)),
            Step::Snap { enabled } => controller.set_snap_enabled(*enabled),
            Step::Merge => {
                if let Err(err) = controller.merge_selected_polygons() {
                    tracing::warn!("Step {}: {}", index, err);
                }
            }
            Step::Delete => match controller.delete_selected_features() {
                Ok(summary) => tracing::info!("Step {}: {:?}", index, summary),
                Err(err) => tracing::warn!("Step {}: {}", index, err),
            },
            Step::Deselect => controller.deselect_all(),
            Step::Pick { layer, reference } => {
                let shot = if *reference {
                    controller.pick_reference_feature(*layer)
                } else {
                    controller.pick_feature(*layer)
                };
                self.pending.push((index, Pending::Feature(shot)));
            }
            Step::DrawLine => {
                self.pending
                    .push((index, Pending::Line(controller.draw_line())));
            }
        }
    }

    /// 取出已结束的一次性操作
    fn collect(&mut self) {
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for (step, pending) in self.pending.drain(..) {
            let outcome = match pending {
                Pending::Feature(mut shot) => match shot.try_result() {
                    None => {
                        still_pending.push((step, Pending::Feature(shot)));
                        continue;
                    }
                    Some(Ok(feature)) => Outcome::Picked {
                        step,
                        uuid: feature.uuid().map(|u| u.to_string()),
                        id: feature.backend_id(),
                    },
                    Some(Err(err)) => Outcome::Failed {
                        step,
                        reason: err.to_string(),
                    },
                },
                Pending::Line(mut shot) => match shot.try_result() {
                    None => {
                        still_pending.push((step, Pending::Line(shot)));
                        continue;
                    }
                    Some(Ok(line)) => Outcome::Line {
                        step,
                        vertices: line.points.len(),
                    },
                    Some(Err(err)) => Outcome::Failed {
                        step,
                        reason: err.to_string(),
                    },
                },
            };
            self.outcomes.push(outcome);
        }
        self.pending = still_pending;
    }
}
