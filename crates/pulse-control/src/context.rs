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

//! Load classification of incoming frames.

pub use pulse_core::context::AnalysisContext;
use pulse_core::frame::{FrameSource, MetricFrame};

/// Loaded chunks above which the world is considered heavy.
const HEAVY_WORLD_CHUNKS: u32 = 500;
/// Alive entities above which the frame is entity heavy.
const ENTITY_HEAVY_COUNT: u32 = 200;
/// Draw calls above which rendering is considered intensive.
const RENDER_INTENSIVE_DRAW_CALLS: u32 = 1500;

/// Classifies a frame from its load indicators. The first matching rule wins.
pub fn classify(frame: &MetricFrame) -> AnalysisContext {
    if frame.source == FrameSource::Server {
        AnalysisContext::ServerProcessing
    } else if frame.world.loaded_chunks > HEAVY_WORLD_CHUNKS {
        AnalysisContext::HeavyWorld
    } else if frame.entities.total_entities > ENTITY_HEAVY_COUNT {
        AnalysisContext::EntityHeavy
    } else if frame.render.draw_calls > RENDER_INTENSIVE_DRAW_CALLS {
        AnalysisContext::RenderIntensive
    } else if frame.network.remote {
        AnalysisContext::Multiplayer
    } else {
        AnalysisContext::Normal
    }
}

/// Applies a context's multiplier to fixed thresholds.
///
/// Thresholds only ever move in the lenient direction: ceilings go up and
/// floors go down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextScale {
    context: AnalysisContext,
    multiplier: f64,
}

impl ContextScale {
    /// Scale for the given context.
    pub fn for_context(context: AnalysisContext) -> Self {
        Self {
            context,
            multiplier: context.multiplier().max(1.0),
        }
    }

    /// The context this scale was built from.
    pub fn context(&self) -> AnalysisContext {
        self.context
    }

    /// Effective multiplier, at least `1.0`.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Relaxes a "higher is worse" threshold.
    pub fn ceiling(&self, threshold: f64) -> f64 {
        threshold * self.multiplier
    }

    /// Relaxes a "lower is worse" threshold.
    pub fn floor(&self, threshold: f64) -> f64 {
        threshold / self.multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_frame_is_normal() {
        assert_eq!(classify(&MetricFrame::at(0, 60)), AnalysisContext::Normal);
    }

    #[test]
    fn test_server_frame_wins_over_load() {
        let mut frame = MetricFrame::at(0, 60);
        frame.source = FrameSource::Server;
        frame.world.loaded_chunks = 900;
        assert_eq!(classify(&frame), AnalysisContext::ServerProcessing);
    }

    #[test]
    fn test_load_bands() {
        let mut frame = MetricFrame::at(0, 60);
        frame.world.loaded_chunks = 501;
        assert_eq!(classify(&frame), AnalysisContext::HeavyWorld);

        let mut frame = MetricFrame::at(0, 60);
        frame.world.loaded_chunks = 500;
        frame.entities.total_entities = 201;
        assert_eq!(classify(&frame), AnalysisContext::EntityHeavy);

        let mut frame = MetricFrame::at(0, 60);
        frame.render.draw_calls = 1600;
        assert_eq!(classify(&frame), AnalysisContext::RenderIntensive);

        let mut frame = MetricFrame::at(0, 60);
        frame.network.remote = true;
        assert_eq!(classify(&frame), AnalysisContext::Multiplayer);
    }

    #[test]
    fn test_scale_never_stricter_than_baseline() {
        for ctx in [
            AnalysisContext::Unknown,
            AnalysisContext::Normal,
            AnalysisContext::HeavyWorld,
            AnalysisContext::EntityHeavy,
            AnalysisContext::RenderIntensive,
            AnalysisContext::ServerProcessing,
            AnalysisContext::Multiplayer,
        ] {
            let scale = ContextScale::for_context(ctx);
            assert!(scale.ceiling(100.0) >= 100.0);
            assert!(scale.floor(30.0) <= 30.0);
        }
    }

    #[test]
    fn test_heavy_world_scaling() {
        let scale = ContextScale::for_context(AnalysisContext::HeavyWorld);
        assert!((scale.ceiling(1000.0) - 1500.0).abs() < 1e-9);
        assert!((scale.floor(30.0) - 20.0).abs() < 1e-9);
    }
}
