use super::Controller;
use crate::features::Observation;
use crate::game::Action;

// flaps whenever the bird sits below the next gap's center; velocity and
// horizontal distance are ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedController;

impl RuleBasedController {
    pub fn new() -> Self {
        Self
    }

    // screen y grows downwards, so "below" is the larger value
    pub fn decide_raw(bird_y: f32, gap_center_y: f32) -> Action {
        if bird_y > gap_center_y {
            Action::Flap
        } else {
            Action::NoOp
        }
    }
}

impl Controller for RuleBasedController {
    fn name(&self) -> &str {
        "rule_based"
    }

    fn decide(&mut self, observation: &Observation) -> Action {
        let bird_y = observation.bird_y();
        Self::decide_raw(bird_y, bird_y + observation.gap_dy())
    }
}
