// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Situational load classes used to relax detection thresholds.

use serde::{Deserialize, Serialize};

/// The load situation a frame was captured in.
///
/// Each context carries a multiplier in `[1.0, 1.5]`. Heavier situations get
/// more lenient thresholds so expected load is not reported as a problem.
///
/// | Context | Multiplier |
/// |---|---|
/// | Unknown, Normal | 1.0 |
/// | Multiplayer | 1.1 |
/// | ServerProcessing | 1.2 |
/// | EntityHeavy | 1.3 |
/// | RenderIntensive | 1.4 |
/// | HeavyWorld | 1.5 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnalysisContext {
    /// Not yet classified.
    #[default]
    Unknown,
    /// Ordinary client workload.
    Normal,
    /// Many chunks loaded.
    HeavyWorld,
    /// Many entities alive.
    EntityHeavy,
    /// Many draw calls per frame.
    RenderIntensive,
    /// Frame produced by a server process.
    ServerProcessing,
    /// Connected to a remote session.
    Multiplayer,
}

impl AnalysisContext {
    /// Threshold multiplier, never below `1.0`.
    pub fn multiplier(self) -> f64 {
        match self {
            AnalysisContext::Unknown | AnalysisContext::Normal => 1.0,
            AnalysisContext::HeavyWorld => 1.5,
            AnalysisContext::EntityHeavy => 1.3,
            AnalysisContext::RenderIntensive => 1.4,
            AnalysisContext::ServerProcessing => 1.2,
            AnalysisContext::Multiplayer => 1.1,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            AnalysisContext::Unknown => "Unknown",
            AnalysisContext::Normal => "Normal Gameplay",
            AnalysisContext::HeavyWorld => "Heavy World",
            AnalysisContext::EntityHeavy => "Entity Heavy",
            AnalysisContext::RenderIntensive => "Render Intensive",
            AnalysisContext::ServerProcessing => "Server Processing",
            AnalysisContext::Multiplayer => "Multiplayer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipliers_stay_in_range() {
        for ctx in [
            AnalysisContext::Unknown,
            AnalysisContext::Normal,
            AnalysisContext::HeavyWorld,
            AnalysisContext::EntityHeavy,
            AnalysisContext::RenderIntensive,
            AnalysisContext::ServerProcessing,
            AnalysisContext::Multiplayer,
        ] {
            let m = ctx.multiplier();
            assert!((1.0..=1.5).contains(&m), "{ctx:?} has multiplier {m}");
        }
    }
}
