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

//! Optimization advice.
//!
//! The `OptimizationEngine` turns a detected issue into at most one concrete
//! suggestion:
//! 1. candidates are looked up in the static catalog,
//! 2. candidates that do not fit the frame, the machine or that are on
//!    cooldown are filtered out,
//! 3. the rest are scored from the base matrix, the rating history, the
//!    per-machine preferences and the severity of the situation,
//! 4. the best one is built with live values from the frame.
//!
//! It also owns the pending suggestion queue and the rating history.

pub mod catalog;
pub mod effectiveness;
mod queue;

pub use effectiveness::{EffectivenessSummary, EffectivenessTrend, Rating, SuggestionEffectiveness};
pub use queue::{QueueOutcome, SuggestionQueue};

use pulse_core::config::ConfigHandle;
use pulse_core::context::AnalysisContext;
use pulse_core::error::{AdvisorError, EffectivenessError, SuggestionError};
use pulse_core::frame::MetricFrame;
use pulse_core::hardware::{GpuType, HardwareKey, HardwareProfile};
use pulse_core::issue::{IssueKind, IssueSeverity};
use pulse_core::suggestion::{SettingsApplier, Suggestion, SuggestionDraft, SuggestionType};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant, SystemTime};

/// Bonus applied to types the user rated highly on this kind of machine.
const PREFERENCE_BONUS: f64 = 1.2;
/// Rating from which a type becomes preferred.
const PREFERRED_RATING: u8 = 4;
/// Memory needed before suggesting a larger allocation.
const MIN_MEMORY_FOR_ALLOCATION_GB: u32 = 8;
/// Memory below which allocation changes are never suggested.
const MIN_MEMORY_HARDWARE_GB: u32 = 4;
/// Cores needed before suggesting CPU tuning.
const MIN_CORES_FOR_CPU_TUNING: u32 = 4;
/// Base score from which a suggestion is considered a strong fit.
const STRONG_FIT_SCORE: f64 = 8.0;

/// Aggregate figures about the advisor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationStatistics {
    /// Suggestions generated since startup.
    pub total_generated: u64,
    /// Suggestions applied since startup.
    pub total_applied: u64,
    /// Suggestions waiting in the queue.
    pub pending: usize,
    /// Suggestion types with a rating history.
    pub tracked_types: usize,
}

impl OptimizationStatistics {
    /// Share of generated suggestions that were applied.
    pub fn application_rate(&self) -> f64 {
        if self.total_generated == 0 {
            0.0
        } else {
            self.total_applied as f64 / self.total_generated as f64
        }
    }

    /// Suggestions are being acted upon and are not piling up.
    pub fn is_performing_well(&self) -> bool {
        self.application_rate() > 0.3 && self.pending < 10
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Generated: {}, Applied: {} ({:.1}%), Pending: {}, Tracked types: {}",
            self.total_generated,
            self.total_applied,
            self.application_rate() * 100.0,
            self.pending,
            self.tracked_types
        )
    }
}

type EffectivenessEntry = Arc<Mutex<SuggestionEffectiveness>>;

/// Generates, queues and learns from optimization suggestions.
pub struct OptimizationEngine {
    config: ConfigHandle,
    hardware: RwLock<HardwareProfile>,
    detected_addons: RwLock<HashSet<String>>,
    runtime_flags_tuned: AtomicBool,
    last_suggested: RwLock<HashMap<SuggestionType, Instant>>,
    effectiveness: RwLock<HashMap<SuggestionType, EffectivenessEntry>>,
    preferred: RwLock<HashMap<HardwareKey, HashSet<SuggestionType>>>,
    queue: SuggestionQueue,
    generated: AtomicU64,
    applied: AtomicU64,
}

impl OptimizationEngine {
    /// Creates an engine for the given machine.
    pub fn new(config: ConfigHandle, hardware: HardwareProfile) -> Self {
        let capacity = config.read(|c| c.suggestion_queue_capacity);
        log::info!("Advisor: initialized for {}.", hardware);
        Self {
            config,
            hardware: RwLock::new(hardware),
            detected_addons: RwLock::new(HashSet::new()),
            runtime_flags_tuned: AtomicBool::new(false),
            last_suggested: RwLock::new(HashMap::new()),
            effectiveness: RwLock::new(HashMap::new()),
            preferred: RwLock::new(HashMap::new()),
            queue: SuggestionQueue::new(capacity),
            generated: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        }
    }

    // --- Host state ---

    /// Replaces the machine profile used for filtering and preferences.
    pub fn set_hardware_profile(&self, profile: HardwareProfile) -> Result<(), AdvisorError> {
        let mut hardware = self
            .hardware
            .write()
            .map_err(|_| AdvisorError::LockPoisoned("hardware profile"))?;
        log::info!("Advisor: hardware profile updated to {}.", profile);
        *hardware = profile;
        Ok(())
    }

    pub fn hardware_profile(&self) -> Result<HardwareProfile, AdvisorError> {
        self.hardware
            .read()
            .map(|h| h.clone())
            .map_err(|_| AdvisorError::LockPoisoned("hardware profile"))
    }

    /// Replaces the list of installed add-ons (mods, plugins, shader packs).
    pub fn set_detected_addons<I, S>(&self, addons: I) -> Result<(), AdvisorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut detected = self
            .detected_addons
            .write()
            .map_err(|_| AdvisorError::LockPoisoned("detected add-ons"))?;
        *detected = addons.into_iter().map(Into::into).collect();
        Ok(())
    }

    /// Declares whether the runtime launch flags are already tuned.
    pub fn set_runtime_flags_tuned(&self, tuned: bool) {
        self.runtime_flags_tuned.store(tuned, Ordering::Relaxed);
    }

    // --- Generation ---

    /// Produces the best suggestion for `issue`, if any applies.
    ///
    /// Returns `None` when suggestions are disabled, when every candidate is
    /// filtered out or on cooldown, or when an internal lock is poisoned.
    pub fn generate_suggestion(
        &self,
        issue: IssueKind,
        frame: &MetricFrame,
        context: AnalysisContext,
    ) -> Option<Suggestion> {
        if !self.config.read(|c| c.optimization_suggestions_enabled) {
            return None;
        }
        match self.try_generate(issue, frame, context) {
            Ok(suggestion) => suggestion,
            Err(e) => {
                log::error!("Advisor: failed to generate a suggestion for {:?}: {}", issue, e);
                None
            }
        }
    }

    fn try_generate(
        &self,
        issue: IssueKind,
        frame: &MetricFrame,
        context: AnalysisContext,
    ) -> Result<Option<Suggestion>, AdvisorError> {
        let hardware = self.hardware_profile()?;
        let now = Instant::now();

        let mut ranked = Vec::new();
        for &candidate in catalog::candidates(issue) {
            if !self.applicable_in_context(candidate, context, frame, &hardware)?
                || !compatible_with_hardware(candidate, &hardware)
                || self.on_cooldown(candidate, now)?
            {
                continue;
            }
            let score = self.score(candidate, issue, frame, &hardware)?;
            ranked.push((candidate, score));
        }

        // Stable sort: equal scores keep catalog order.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let Some(&(chosen, score)) = ranked.first() else {
            log::debug!("Advisor: no applicable suggestion for {:?}.", issue);
            return Ok(None);
        };

        let suggestion = build_suggestion(chosen, issue, frame, context, &hardware);
        self.last_suggested
            .write()
            .map_err(|_| AdvisorError::LockPoisoned("cooldowns"))?
            .insert(chosen, now);
        self.generated.fetch_add(1, Ordering::Relaxed);

        log::debug!(
            "Advisor: suggesting {:?} for {:?} (score {:.2}, priority {}).",
            chosen,
            issue,
            score,
            suggestion.priority()
        );
        Ok(Some(suggestion))
    }

    fn applicable_in_context(
        &self,
        suggestion: SuggestionType,
        context: AnalysisContext,
        frame: &MetricFrame,
        hardware: &HardwareProfile,
    ) -> Result<bool, AdvisorError> {
        Ok(match suggestion {
            SuggestionType::ReduceRenderDistance => {
                frame.world.render_distance > catalog::MIN_USEFUL_RENDER_DISTANCE
            }
            SuggestionType::AdjustMemoryAllocation => {
                hardware.total_memory_gb >= MIN_MEMORY_FOR_ALLOCATION_GB
            }
            SuggestionType::DisableShaders => self.shader_addon_detected()?,
            SuggestionType::ReduceSimulationDistance => context == AnalysisContext::HeavyWorld,
            SuggestionType::OptimizeEntityRendering => {
                frame.entities.rendered_entities > catalog::ENTITY_RENDERING_MIN
            }
            SuggestionType::UpdateDrivers => hardware.gpu_type != GpuType::Integrated,
            SuggestionType::OptimizeRuntimeFlags => !self.runtime_flags_tuned.load(Ordering::Relaxed),
            _ => true,
        })
    }

    fn shader_addon_detected(&self) -> Result<bool, AdvisorError> {
        let addons = self
            .detected_addons
            .read()
            .map_err(|_| AdvisorError::LockPoisoned("detected add-ons"))?;
        Ok(addons.iter().any(|name| {
            let name = name.to_lowercase();
            name.contains("shader") || name.contains("iris") || name.contains("optifine")
        }))
    }

    /// Effective cooldown window of a type: configured override, else built-in.
    pub fn cooldown(&self, suggestion: SuggestionType) -> Option<Duration> {
        match self.config.read(|c| c.cooldown_overrides.get(&suggestion).copied()) {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => catalog::default_cooldown(suggestion),
        }
    }

    fn on_cooldown(&self, suggestion: SuggestionType, now: Instant) -> Result<bool, AdvisorError> {
        let Some(window) = self.cooldown(suggestion) else {
            return Ok(false);
        };
        let last = self
            .last_suggested
            .read()
            .map_err(|_| AdvisorError::LockPoisoned("cooldowns"))?;
        Ok(last
            .get(&suggestion)
            .is_some_and(|at| now.saturating_duration_since(*at) < window))
    }

    /// Returns `true` if `suggestion` is currently suppressed by its cooldown.
    pub fn is_on_cooldown(&self, suggestion: SuggestionType) -> bool {
        self.on_cooldown(suggestion, Instant::now()).unwrap_or(false)
    }

    fn score(
        &self,
        suggestion: SuggestionType,
        issue: IssueKind,
        frame: &MetricFrame,
        hardware: &HardwareProfile,
    ) -> Result<f64, AdvisorError> {
        let mut score = catalog::base_score(suggestion, issue);

        // ── History ──
        let entry = self
            .effectiveness
            .read()
            .map_err(|_| AdvisorError::LockPoisoned("effectiveness"))?
            .get(&suggestion)
            .cloned();
        if let Some(entry) = entry {
            let record = entry
                .lock()
                .map_err(|_| AdvisorError::LockPoisoned("effectiveness entry"))?;
            if record.rating_count() > 0 {
                score *= 0.5 + record.average_rating() / 5.0;
            }
        }

        // ── Preference ──
        let preferred = self
            .preferred
            .read()
            .map_err(|_| AdvisorError::LockPoisoned("preferences"))?;
        if preferred
            .get(&hardware.key())
            .is_some_and(|types| types.contains(&suggestion))
        {
            score *= PREFERENCE_BONUS;
        }

        Ok(score * severity_multiplier(issue, frame))
    }

    // --- Queue ---

    /// Queues a suggestion unless one with the same type and issue is pending.
    pub fn queue_suggestion(&self, suggestion: Suggestion) -> QueueOutcome {
        let key = suggestion.dedup_key();
        let outcome = self.queue.push(suggestion);
        if outcome == QueueOutcome::Queued {
            log::debug!("Advisor: queued {:?} for {:?}.", key.0, key.1);
        }
        outcome
    }

    /// Removes the oldest pending suggestion.
    pub fn next_suggestion(&self) -> Option<Suggestion> {
        self.queue.pop()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Discards every pending suggestion.
    pub fn clear_suggestions(&self) -> usize {
        let removed = self.queue.clear();
        log::info!("Advisor: cleared {} pending suggestions.", removed);
        removed
    }

    // --- Feedback ---

    fn effectiveness_entry(
        &self,
        suggestion: SuggestionType,
    ) -> Result<EffectivenessEntry, EffectivenessError> {
        let mut map = self
            .effectiveness
            .write()
            .map_err(|_| EffectivenessError::Unavailable)?;
        Ok(map
            .entry(suggestion)
            .or_insert_with(|| Arc::new(Mutex::new(SuggestionEffectiveness::new(suggestion))))
            .clone())
    }

    /// Records how well an applied suggestion worked, from 1 to 5.
    ///
    /// Ratings of 4 and above make the type preferred on this kind of machine.
    pub fn record_suggestion_effectiveness(
        &self,
        suggestion: SuggestionType,
        rating: u8,
        feedback: impl Into<String>,
    ) -> Result<(), EffectivenessError> {
        if !(1..=5).contains(&rating) {
            return Err(EffectivenessError::InvalidRating(rating));
        }

        let entry = self.effectiveness_entry(suggestion)?;
        entry
            .lock()
            .map_err(|_| EffectivenessError::Unavailable)?
            .add_rating(rating, feedback)?;

        if rating >= PREFERRED_RATING {
            let key = self
                .hardware
                .read()
                .map_err(|_| EffectivenessError::Unavailable)?
                .key();
            self.preferred
                .write()
                .map_err(|_| EffectivenessError::Unavailable)?
                .entry(key)
                .or_default()
                .insert(suggestion);
        }

        log::debug!("Advisor: recorded rating {} for {:?}.", rating, suggestion);
        Ok(())
    }

    /// Reloads persisted ratings of a type. Returns the number restored.
    ///
    /// The batch is all or nothing: one invalid rating rejects every entry.
    pub fn restore_ratings<I, S>(
        &self,
        suggestion: SuggestionType,
        ratings: I,
    ) -> Result<usize, EffectivenessError>
    where
        I: IntoIterator<Item = (u8, S, SystemTime)>,
        S: Into<String>,
    {
        let batch: Vec<(u8, S, SystemTime)> = ratings.into_iter().collect();
        if let Some((rating, _, _)) = batch.iter().find(|(r, _, _)| !(1..=5).contains(r)) {
            return Err(EffectivenessError::InvalidRating(*rating));
        }

        let entry = self.effectiveness_entry(suggestion)?;
        let mut record = entry.lock().map_err(|_| EffectivenessError::Unavailable)?;
        let restored = batch.len();
        for (rating, feedback, timestamp) in batch {
            record.add_rating_at(rating, feedback, timestamp)?;
        }
        Ok(restored)
    }

    /// Snapshot of the rating history of a type.
    pub fn effectiveness(&self, suggestion: SuggestionType) -> Option<EffectivenessSummary> {
        let entry = self.effectiveness.read().ok()?.get(&suggestion).cloned()?;
        let record = entry.lock().ok()?;
        Some(record.summary())
    }

    /// Returns `true` if the user rated this type highly on the current machine.
    pub fn is_preferred(&self, suggestion: SuggestionType) -> bool {
        let Ok(hardware) = self.hardware.read() else {
            return false;
        };
        let Ok(preferred) = self.preferred.read() else {
            return false;
        };
        preferred
            .get(&hardware.key())
            .is_some_and(|types| types.contains(&suggestion))
    }

    // --- Application ---

    /// Records that the user applied a suggestion by hand.
    pub fn mark_applied(&self, suggestion: &mut Suggestion) -> Result<(), SuggestionError> {
        suggestion.mark_applied()?;
        self.applied.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Applies a suggestion through the host and records it as applied.
    pub fn auto_apply(
        &self,
        suggestion: &mut Suggestion,
        applier: &dyn SettingsApplier,
    ) -> Result<(), SuggestionError> {
        suggestion.execute_auto_apply(applier)?;
        self.applied.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "Advisor: auto-applied '{}' ({:?}).",
            suggestion.title(),
            suggestion.auto_apply()
        );
        Ok(())
    }

    // --- Statistics ---

    pub fn statistics(&self) -> OptimizationStatistics {
        OptimizationStatistics {
            total_generated: self.generated.load(Ordering::Relaxed),
            total_applied: self.applied.load(Ordering::Relaxed),
            pending: self.queue.len(),
            tracked_types: self.effectiveness.read().map(|m| m.len()).unwrap_or(0),
        }
    }

    /// Forgets cooldowns, ratings, preferences and pending suggestions.
    pub fn reset(&self) {
        self.queue.clear();
        if let Ok(mut last) = self.last_suggested.write() {
            last.clear();
        }
        if let Ok(mut effectiveness) = self.effectiveness.write() {
            effectiveness.clear();
        }
        if let Ok(mut preferred) = self.preferred.write() {
            preferred.clear();
        }
        log::info!("Advisor: state reset.");
    }
}

fn compatible_with_hardware(suggestion: SuggestionType, hardware: &HardwareProfile) -> bool {
    match suggestion {
        SuggestionType::EnableHardwareAcceleration => hardware.gpu_type != GpuType::None,
        SuggestionType::AdjustMemoryAllocation => hardware.total_memory_gb >= MIN_MEMORY_HARDWARE_GB,
        SuggestionType::UpdateDrivers => hardware.gpu_type != GpuType::Integrated,
        SuggestionType::OptimizeCpuSettings => hardware.cpu_cores >= MIN_CORES_FOR_CPU_TUNING,
        _ => true,
    }
}

/// Urgency multiplier from the issue severity and the live frame.
fn severity_multiplier(issue: IssueKind, frame: &MetricFrame) -> f64 {
    let mut multiplier = match issue.severity() {
        IssueSeverity::Critical => 2.0,
        IssueSeverity::High => 1.5,
        _ => 1.0,
    };
    if frame.fps < 15 {
        multiplier *= 1.8;
    } else if frame.fps < 30 {
        multiplier *= 1.3;
    }
    if frame.memory.heap_usage_percent() > 90.0 {
        multiplier *= 1.6;
    }
    multiplier
}

/// Urgency of a suggestion from 1 to 10.
fn priority(suggestion: SuggestionType, issue: IssueKind, frame: &MetricFrame) -> u8 {
    let mut priority = issue.severity().weight() + 2;
    if frame.fps < 15 {
        priority += 3;
    } else if frame.fps < 30 {
        priority += 1;
    }
    if frame.memory.heap_usage_percent() > 90.0 {
        priority += 2;
    }
    if catalog::base_score(suggestion, issue) >= STRONG_FIT_SCORE {
        priority += 1;
    }
    priority.clamp(1, 10) as u8
}

fn build_suggestion(
    suggestion: SuggestionType,
    issue: IssueKind,
    frame: &MetricFrame,
    context: AnalysisContext,
    hardware: &HardwareProfile,
) -> Suggestion {
    Suggestion::new(SuggestionDraft {
        suggestion_type: suggestion,
        issue,
        context,
        title: catalog::title(suggestion).to_string(),
        description: catalog::description(suggestion, frame, hardware),
        priority: priority(suggestion, issue, frame),
        difficulty: catalog::difficulty(suggestion),
        impact: catalog::impact(suggestion, issue),
        estimated_minutes: catalog::estimated_minutes(suggestion),
        steps: catalog::steps(suggestion),
        warnings: catalog::warnings(suggestion),
        requirements: catalog::requirements(suggestion),
        related_settings: catalog::related_settings(suggestion, frame, hardware),
        auto_apply: catalog::auto_apply(suggestion, frame),
    })
}
