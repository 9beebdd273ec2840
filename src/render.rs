//! Scene composition
//!
//! Turns a `SessionSnapshot` into primitive draw commands for a render sink.
//! No geometry is kept between frames; everything is derived from the
//! snapshot, with the breathing pulse driven by its timestamp.

use crate::coach::{CHAKRA_COLORS, CHAKRA_NAMES};
use crate::types::{SessionSnapshot, CHAKRA_COUNT};
use serde::{Deserialize, Serialize};

/// RGBA color, alpha in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Rgba,
}

/// Primitive draw call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    Circle {
        x: f64,
        y: f64,
        radius: f64,
        color: Rgba,
        /// Stroke width; `None` fills the circle
        stroke: Option<f64>,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        color: Rgba,
        width: f64,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        color: Rgba,
        size: f64,
    },
    /// Full-surface fill with a radial gradient
    RadialGradient {
        x: f64,
        y: f64,
        inner_radius: f64,
        outer_radius: f64,
        stops: Vec<GradientStop>,
    },
}

const GOLD: Rgba = Rgba::rgb(255, 215, 0);
const ORANGE: Rgba = Rgba::rgb(255, 140, 0);
const WARNING_RED: Rgba = Rgba::rgb(255, 60, 60);
const PROGRESS_TRACK: Rgba = Rgba::rgb(20, 20, 25);
const PROGRESS_FILL: Rgba = Rgba::rgb(0, 255, 255);

/// Base chakra radius before energy growth
const CHAKRA_BASE_RADIUS: f64 = 18.0;
/// Radius gained at full energy
const CHAKRA_ENERGY_RADIUS: f64 = 22.0;

/// Builds draw commands for a surface of a given size
#[derive(Debug, Clone)]
pub struct SceneComposer {
    width: f64,
    height: f64,
}

impl Default for SceneComposer {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

impl SceneComposer {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn compose(&self, snapshot: &SessionSnapshot) -> Vec<DrawCommand> {
        let mut commands = Vec::new();
        self.draw_aura(snapshot.aura_intensity, &mut commands);
        self.draw_chakras(snapshot, &mut commands);
        self.draw_hud(snapshot, &mut commands);
        commands
    }

    fn draw_aura(&self, intensity: f64, commands: &mut Vec<DrawCommand>) {
        if intensity <= 0.01 {
            return;
        }
        commands.push(DrawCommand::RadialGradient {
            x: self.width / 2.0,
            y: self.height / 2.0,
            inner_radius: 100.0,
            outer_radius: self.width.max(self.height) * 0.8,
            stops: vec![
                GradientStop {
                    offset: 0.0,
                    color: GOLD.with_alpha(intensity * 0.3),
                },
                GradientStop {
                    offset: 0.5,
                    color: ORANGE.with_alpha(intensity * 0.1),
                },
                GradientStop {
                    offset: 1.0,
                    color: Rgba::TRANSPARENT,
                },
            ],
        });
    }

    /// Vertical chakra column, root at the bottom
    fn draw_chakras(&self, snapshot: &SessionSnapshot, commands: &mut Vec<DrawCommand>) {
        let t = snapshot.timestamp_ms as f64 / 1000.0;
        let breath = 1.0 + 0.1 * (t * 0.8).sin();
        let x = self.width * 0.5;
        let bottom = self.height * 0.8;
        let top = self.height * 0.2;
        let step = (top - bottom) / (CHAKRA_COUNT - 1) as f64;

        for (i, energy) in snapshot.energies.iter().enumerate() {
            let y = bottom + i as f64 * step;
            let radius = chakra_radius(*energy) * breath;
            let (r, g, b) = CHAKRA_COLORS[i];
            let color = Rgba::rgb(r, g, b);

            commands.push(DrawCommand::Circle {
                x,
                y,
                radius: radius * 1.5,
                color: color.with_alpha((0.25 + 0.5 * energy).min(0.9)),
                stroke: None,
            });
            commands.push(DrawCommand::Circle {
                x,
                y,
                radius,
                color,
                stroke: None,
            });
            commands.push(DrawCommand::Text {
                x: x + 30.0,
                y: y + 5.0,
                text: CHAKRA_NAMES[i].to_string(),
                color: Rgba::WHITE,
                size: 16.0,
            });
        }
    }

    fn draw_hud(&self, snapshot: &SessionSnapshot, commands: &mut Vec<DrawCommand>) {
        commands.push(DrawCommand::Text {
            x: 20.0,
            y: 40.0,
            text: snapshot.confirmed.display_name().to_string(),
            color: Rgba::WHITE,
            size: 24.0,
        });

        // Level bar, top right
        let bar_width = 220.0;
        let bar_x = self.width - bar_width - 20.0;
        let bar_y = 30.0;
        commands.push(DrawCommand::Text {
            x: bar_x,
            y: bar_y - 10.0,
            text: format!("Level {}", snapshot.level),
            color: Rgba::WHITE,
            size: 16.0,
        });
        commands.push(DrawCommand::Line {
            from: (bar_x, bar_y),
            to: (bar_x + bar_width, bar_y),
            color: PROGRESS_TRACK,
            width: 15.0,
        });
        if snapshot.level_progress > 0.0 {
            commands.push(DrawCommand::Line {
                from: (bar_x, bar_y),
                to: (bar_x + bar_width * snapshot.level_progress, bar_y),
                color: PROGRESS_FILL,
                width: 15.0,
            });
        }

        if let Some(warning) = snapshot.warning {
            commands.push(DrawCommand::Text {
                x: bar_x,
                y: bar_y + 35.0,
                text: warning.message().to_string(),
                color: WARNING_RED,
                size: 16.0,
            });
        }

        let bio = &snapshot.biometrics;
        if bio.is_connected && bio.heart_rate > 0 {
            // Pulse grows on the frame a beat lands
            let pulse = if bio.beat_detected { 12.0 } else { 9.0 };
            commands.push(DrawCommand::Circle {
                x: 30.0,
                y: 80.0,
                radius: pulse,
                color: Rgba::rgb(255, 0, 0),
                stroke: None,
            });
            commands.push(DrawCommand::Text {
                x: 50.0,
                y: 86.0,
                text: format!("{} BPM  SpO2 {}%  HRV {}", bio.heart_rate, bio.spo2, bio.hrv_index),
                color: Rgba::WHITE,
                size: 16.0,
            });
        }

        if !snapshot.feedback.is_empty() {
            commands.push(DrawCommand::Text {
                x: 20.0,
                y: self.height - 30.0,
                text: snapshot.feedback.clone(),
                color: Rgba::WHITE,
                size: 20.0,
            });
        }
    }
}

/// Chakra radius at a given energy, before the breathing pulse
pub fn chakra_radius(energy: f64) -> f64 {
    CHAKRA_BASE_RADIUS + energy * CHAKRA_ENERGY_RADIUS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionEngine;

    fn circles(commands: &[DrawCommand]) -> Vec<(f64, f64, f64)> {
        commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Circle {
                    x,
                    y,
                    radius,
                    stroke: None,
                    color,
                } if color.a == 1.0 && *x == 640.0 => Some((*x, *y, *radius)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_chakra_column_root_at_bottom() {
        let mut snapshot = SessionEngine::default().snapshot(0);
        snapshot.energies = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let commands = SceneComposer::default().compose(&snapshot);

        let column = circles(&commands);
        assert_eq!(column.len(), CHAKRA_COUNT);
        assert!((column[0].1 - 576.0).abs() < 1e-9);
        assert!((column[6].1 - 144.0).abs() < 1e-9);
        assert!((column[0].2 - 18.0).abs() < 1e-9);
        assert!((column[6].2 - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_aura_only_when_intense() {
        let mut snapshot = SessionEngine::default().snapshot(0);
        let composer = SceneComposer::default();
        let has_aura = |commands: &[DrawCommand]| {
            commands
                .iter()
                .any(|c| matches!(c, DrawCommand::RadialGradient { .. }))
        };

        assert!(!has_aura(&composer.compose(&snapshot)));
        snapshot.aura_intensity = 0.5;
        assert!(has_aura(&composer.compose(&snapshot)));
    }

    #[test]
    fn test_warning_and_feedback_text() {
        let mut snapshot = SessionEngine::default().snapshot(0);
        snapshot.warning = Some(crate::types::ProgressWarning::CloseEyes);
        snapshot.feedback = "Focus on breath.".to_string();
        let texts: Vec<String> = SceneComposer::default()
            .compose(&snapshot)
            .into_iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert!(texts.contains(&"CLOSE EYES TO PROGRESS!".to_string()));
        assert!(texts.contains(&"Focus on breath.".to_string()));
        assert!(texts.contains(&"Level 1".to_string()));
    }

    #[test]
    fn test_command_serialization() {
        let json = serde_json::to_value(DrawCommand::Line {
            from: (0.0, 0.0),
            to: (1.0, 1.0),
            color: Rgba::WHITE,
            width: 2.0,
        })
        .unwrap();
        assert_eq!(json["kind"], "line");
    }
}
