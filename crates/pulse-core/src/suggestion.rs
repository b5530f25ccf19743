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

//! Optimization suggestions and the remediation vocabulary they draw from.
//!
//! A [`Suggestion`] is built once by the advisor and then handed to the
//! consumer. Only the user-controlled state (applied, rated) changes after
//! construction, and each of those fields can be set exactly once.

use crate::context::AnalysisContext;
use crate::error::{ApplyError, SuggestionError};
use crate::issue::IssueKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Age after which an unapplied suggestion is considered stale.
const EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// A remediation the advisor can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SuggestionType {
    // Graphics
    /// Lower the render distance.
    ReduceRenderDistance,
    /// Switch to a performance-oriented graphics preset.
    OptimizeGraphicsSettings,
    /// Turn off shader packs.
    DisableShaders,
    /// Lower particle effects.
    ReduceParticles,
    /// Turn off smooth lighting.
    DisableSmoothLighting,
    /// Use a lower resolution texture pack.
    OptimizeTexturePack,
    /// Limit how far entities are drawn.
    OptimizeEntityRendering,
    // Memory
    /// Change the heap size given to the application.
    AdjustMemoryAllocation,
    /// Reduce overall memory consumption.
    ReduceMemoryUsage,
    /// Prune world data and unused chunks.
    CleanupWorldData,
    /// Restart the application to reclaim memory.
    RestartGame,
    /// Close other memory hungry applications.
    CloseUnnecessaryApplications,
    // World
    /// Keep fewer chunks loaded.
    ReduceLoadedChunks,
    /// Lower the simulation distance.
    ReduceSimulationDistance,
    /// Tune world generation.
    OptimizeWorldGeneration,
    /// Remove entities from the world.
    ReduceEntityCount,
    /// Enable entity culling.
    ImplementEntityCulling,
    /// Tune creature spawning.
    AdjustSpawningSettings,
    // System
    /// Tune the managed runtime's launch flags.
    OptimizeRuntimeFlags,
    /// Upgrade the managed runtime.
    UpdateRuntime,
    /// Install current graphics drivers.
    UpdateDrivers,
    /// Turn on hardware acceleration.
    EnableHardwareAcceleration,
    /// Tune CPU power and affinity settings.
    OptimizeCpuSettings,
    // Mods
    /// Disable mods that misbehave.
    DisableProblematicMods,
    /// Update installed mods.
    UpdateMods,
    // Network
    /// Tune network settings.
    OptimizeNetworkSettings,
    /// Reduce bandwidth consumption.
    ReduceNetworkUsage,
    /// Check the connection.
    CheckInternetConnection,
    /// Play on a closer or less loaded server.
    ChangeServer,
    // General
    /// Report the problem to mod developers.
    ReportBug,
    /// General advice when nothing specific applies.
    GeneralPerformanceTips,
}

impl SuggestionType {
    /// Every suggestion type, in declaration order.
    pub const ALL: [SuggestionType; 31] = [
        SuggestionType::ReduceRenderDistance,
        SuggestionType::OptimizeGraphicsSettings,
        SuggestionType::DisableShaders,
        SuggestionType::ReduceParticles,
        SuggestionType::DisableSmoothLighting,
        SuggestionType::OptimizeTexturePack,
        SuggestionType::OptimizeEntityRendering,
        SuggestionType::AdjustMemoryAllocation,
        SuggestionType::ReduceMemoryUsage,
        SuggestionType::CleanupWorldData,
        SuggestionType::RestartGame,
        SuggestionType::CloseUnnecessaryApplications,
        SuggestionType::ReduceLoadedChunks,
        SuggestionType::ReduceSimulationDistance,
        SuggestionType::OptimizeWorldGeneration,
        SuggestionType::ReduceEntityCount,
        SuggestionType::ImplementEntityCulling,
        SuggestionType::AdjustSpawningSettings,
        SuggestionType::OptimizeRuntimeFlags,
        SuggestionType::UpdateRuntime,
        SuggestionType::UpdateDrivers,
        SuggestionType::EnableHardwareAcceleration,
        SuggestionType::OptimizeCpuSettings,
        SuggestionType::DisableProblematicMods,
        SuggestionType::UpdateMods,
        SuggestionType::OptimizeNetworkSettings,
        SuggestionType::ReduceNetworkUsage,
        SuggestionType::CheckInternetConnection,
        SuggestionType::ChangeServer,
        SuggestionType::ReportBug,
        SuggestionType::GeneralPerformanceTips,
    ];

    /// Short imperative description.
    pub fn description(self) -> &'static str {
        use SuggestionType::*;
        match self {
            ReduceRenderDistance => "Reduce render distance for better FPS",
            OptimizeGraphicsSettings => "Optimize graphics settings for performance",
            DisableShaders => "Disable shaders to improve performance",
            ReduceParticles => "Reduce particle effects",
            DisableSmoothLighting => "Disable smooth lighting",
            OptimizeTexturePack => "Use an optimized texture pack",
            OptimizeEntityRendering => "Optimize entity rendering distance",
            AdjustMemoryAllocation => "Adjust memory allocation",
            ReduceMemoryUsage => "Reduce overall memory usage",
            CleanupWorldData => "Clean up world data and unused chunks",
            RestartGame => "Restart the game to clear memory",
            CloseUnnecessaryApplications => "Close unnecessary background applications",
            ReduceLoadedChunks => "Reduce the number of loaded chunks",
            ReduceSimulationDistance => "Reduce simulation distance",
            OptimizeWorldGeneration => "Optimize world generation settings",
            ReduceEntityCount => "Reduce entity count in the world",
            ImplementEntityCulling => "Enable entity culling",
            AdjustSpawningSettings => "Adjust spawning settings",
            OptimizeRuntimeFlags => "Optimize runtime launch flags",
            UpdateRuntime => "Update to a newer runtime version",
            UpdateDrivers => "Update graphics drivers",
            EnableHardwareAcceleration => "Enable hardware acceleration",
            OptimizeCpuSettings => "Optimize CPU-related settings",
            DisableProblematicMods => "Disable mods causing performance issues",
            UpdateMods => "Update mods to their latest versions",
            OptimizeNetworkSettings => "Optimize network settings",
            ReduceNetworkUsage => "Reduce network bandwidth usage",
            CheckInternetConnection => "Check internet connection stability",
            ChangeServer => "Consider changing to a different server",
            ReportBug => "Report the performance bug to mod developers",
            GeneralPerformanceTips => "Apply general performance tips",
        }
    }

    /// Grouping used to organise suggestions for display.
    pub fn category(self) -> SuggestionCategory {
        use SuggestionType::*;
        match self {
            ReduceRenderDistance | OptimizeGraphicsSettings | DisableShaders | ReduceParticles
            | DisableSmoothLighting | OptimizeTexturePack => SuggestionCategory::Graphics,
            AdjustMemoryAllocation | OptimizeRuntimeFlags | UpdateRuntime | ReduceMemoryUsage => {
                SuggestionCategory::Memory
            }
            CleanupWorldData | ReduceLoadedChunks | OptimizeWorldGeneration | ReduceEntityCount
            | ImplementEntityCulling => SuggestionCategory::World,
            DisableProblematicMods | UpdateMods => SuggestionCategory::Mods,
            UpdateDrivers | EnableHardwareAcceleration | OptimizeCpuSettings => {
                SuggestionCategory::Hardware
            }
            OptimizeNetworkSettings | ReduceNetworkUsage | CheckInternetConnection
            | ChangeServer => SuggestionCategory::Network,
            _ => SuggestionCategory::General,
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Display grouping of suggestion types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionCategory {
    /// Visual rendering.
    Graphics,
    /// Memory allocation and garbage collection.
    Memory,
    /// World and gameplay.
    World,
    /// Hardware and drivers.
    Hardware,
    /// Network and multiplayer.
    Network,
    /// Mods and add-ons.
    Mods,
    /// Everything else.
    General,
}

impl SuggestionCategory {
    /// Display name.
    pub fn display_name(self) -> &'static str {
        match self {
            SuggestionCategory::Graphics => "Graphics & Rendering",
            SuggestionCategory::Memory => "Memory Management",
            SuggestionCategory::World => "World & Gameplay",
            SuggestionCategory::Hardware => "Hardware & Drivers",
            SuggestionCategory::Network => "Network & Multiplayer",
            SuggestionCategory::Mods => "Mods & Add-ons",
            SuggestionCategory::General => "General",
        }
    }
}

/// A settings change the host can perform without user involvement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoApplyAction {
    /// Change the render distance.
    SetRenderDistance {
        /// Current distance in chunks.
        from: u32,
        /// Target distance in chunks.
        to: u32,
    },
    /// Change the simulation distance.
    SetSimulationDistance {
        /// Current distance in chunks.
        from: u32,
        /// Target distance in chunks.
        to: u32,
    },
    /// Switch to the fast graphics preset.
    ApplyPerformancePreset,
    /// Lower particle effects.
    ReduceParticles,
    /// Turn off smooth lighting.
    DisableSmoothLighting,
}

/// Host-side executor of [`AutoApplyAction`]s.
pub trait SettingsApplier: Send + Sync {
    /// Performs the action, or reports why it could not.
    fn apply(&self, action: &AutoApplyAction) -> Result<(), ApplyError>;
}

/// Parameters of a new [`Suggestion`].
#[derive(Debug, Clone)]
pub struct SuggestionDraft {
    /// Remediation being suggested.
    pub suggestion_type: SuggestionType,
    /// Issue that triggered the suggestion.
    pub issue: IssueKind,
    /// Load context of the triggering frame.
    pub context: AnalysisContext,
    /// Headline.
    pub title: String,
    /// Explanation including live metric values.
    pub description: String,
    /// Urgency, 1 to 10.
    pub priority: u8,
    /// Effort, 1 to 5.
    pub difficulty: u8,
    /// Expected benefit, 1 to 5.
    pub impact: u8,
    /// Expected time to apply, in minutes.
    pub estimated_minutes: u32,
    /// Ordered steps.
    pub steps: Vec<String>,
    /// Risks to be aware of.
    pub warnings: Vec<String>,
    /// Preconditions.
    pub requirements: Vec<String>,
    /// Setting names and recommended values.
    pub related_settings: BTreeMap<String, serde_json::Value>,
    /// Action the host can perform automatically.
    pub auto_apply: Option<AutoApplyAction>,
}

/// A prioritized, context-aware optimization suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    id: Uuid,
    suggestion_type: SuggestionType,
    issue: IssueKind,
    context: AnalysisContext,
    title: String,
    description: String,
    priority: u8,
    difficulty: u8,
    impact: u8,
    estimated_minutes: u32,
    steps: Vec<String>,
    warnings: Vec<String>,
    requirements: Vec<String>,
    related_settings: BTreeMap<String, serde_json::Value>,
    auto_apply: Option<AutoApplyAction>,
    created_at: SystemTime,
    applied_at: Option<SystemTime>,
    rating: Option<u8>,
    feedback: Option<String>,
}

impl Suggestion {
    /// Builds a suggestion, clamping the scales to their documented ranges.
    pub fn new(draft: SuggestionDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            suggestion_type: draft.suggestion_type,
            issue: draft.issue,
            context: draft.context,
            title: draft.title,
            description: draft.description,
            priority: draft.priority.clamp(1, 10),
            difficulty: draft.difficulty.clamp(1, 5),
            impact: draft.impact.clamp(1, 5),
            estimated_minutes: draft.estimated_minutes,
            steps: draft.steps,
            warnings: draft.warnings,
            requirements: draft.requirements,
            related_settings: draft.related_settings,
            auto_apply: draft.auto_apply,
            created_at: SystemTime::now(),
            applied_at: None,
            rating: None,
            feedback: None,
        }
    }

    /// Unique identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Remediation being suggested.
    pub fn suggestion_type(&self) -> SuggestionType {
        self.suggestion_type
    }

    /// Issue that triggered the suggestion.
    pub fn issue(&self) -> IssueKind {
        self.issue
    }

    /// Load context of the triggering frame.
    pub fn context(&self) -> AnalysisContext {
        self.context
    }

    /// Two suggestions with the same key are considered the same suggestion.
    pub fn dedup_key(&self) -> (SuggestionType, IssueKind) {
        (self.suggestion_type, self.issue)
    }

    /// Display grouping.
    pub fn category(&self) -> SuggestionCategory {
        self.suggestion_type.category()
    }

    /// Headline.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Explanation.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Urgency, 1 to 10.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Effort, 1 to 5.
    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    /// Expected benefit, 1 to 5.
    pub fn impact(&self) -> u8 {
        self.impact
    }

    /// Expected time to apply.
    pub fn estimated_minutes(&self) -> u32 {
        self.estimated_minutes
    }

    /// Ordered implementation steps.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Risks to be aware of.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Preconditions.
    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    /// Setting names and recommended values.
    pub fn related_settings(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.related_settings
    }

    /// Action the host may perform automatically.
    pub fn auto_apply(&self) -> Option<&AutoApplyAction> {
        self.auto_apply.as_ref()
    }

    /// `true` if the host may apply this suggestion without user steps.
    pub fn can_auto_apply(&self) -> bool {
        self.auto_apply.is_some()
    }

    /// Creation time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// `true` once the user (or the host) applied the suggestion.
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }

    /// When the suggestion was applied.
    pub fn applied_at(&self) -> Option<SystemTime> {
        self.applied_at
    }

    /// Rating given by the user, 1 to 5.
    pub fn rating(&self) -> Option<u8> {
        self.rating
    }

    /// Free-text feedback.
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Records that the suggestion was applied. Can only happen once.
    pub fn mark_applied(&mut self) -> Result<(), SuggestionError> {
        if self.applied_at.is_some() {
            return Err(SuggestionError::AlreadyApplied);
        }
        self.applied_at = Some(SystemTime::now());
        Ok(())
    }

    /// Records the user's rating and feedback. Can only happen once.
    pub fn record_feedback(
        &mut self,
        rating: u8,
        feedback: impl Into<String>,
    ) -> Result<(), SuggestionError> {
        if !(1..=5).contains(&rating) {
            return Err(SuggestionError::InvalidRating(rating));
        }
        if self.rating.is_some() {
            return Err(SuggestionError::AlreadyRated);
        }
        self.rating = Some(rating);
        self.feedback = Some(feedback.into());
        Ok(())
    }

    /// Runs the automatic action through the host and marks the suggestion applied.
    pub fn execute_auto_apply(
        &mut self,
        applier: &dyn SettingsApplier,
    ) -> Result<(), SuggestionError> {
        if self.applied_at.is_some() {
            return Err(SuggestionError::AlreadyApplied);
        }
        let action = self
            .auto_apply
            .as_ref()
            .ok_or(SuggestionError::NotAutoApplicable)?;
        applier.apply(action)?;
        self.mark_applied()
    }

    /// Time elapsed since creation.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed().unwrap_or_default()
    }

    /// `true` when older than 24 hours.
    pub fn is_expired(&self) -> bool {
        self.age() > EXPIRY
    }

    /// Label for the difficulty scale.
    pub fn difficulty_label(&self) -> &'static str {
        match self.difficulty {
            1 => "Very Easy (1-2 minutes)",
            2 => "Easy (2-5 minutes)",
            3 => "Medium (5-15 minutes)",
            4 => "Hard (15-30 minutes)",
            _ => "Very Hard (30+ minutes)",
        }
    }

    /// Label for the impact scale.
    pub fn impact_label(&self) -> &'static str {
        match self.impact {
            1 => "Low Impact",
            2 => "Minor Impact",
            3 => "Moderate Impact",
            4 => "High Impact",
            _ => "Very High Impact",
        }
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[P{}] {} ({})",
            self.priority, self.title, self.issue
        )
    }
}
