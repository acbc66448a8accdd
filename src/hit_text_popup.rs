use bevy::prelude::*;

use crate::health::{Damaged, Killed};

/// The 'Observer' half of the Observer pattern: watches one Health subject
/// and flashes transient text when it gets hit or killed. It never polls the
/// health value — it only reacts to the notifications.
///
/// The popup also shows how to unsubscribe whenever you want, independent of
/// entity despawning: stop_observing() can be called at any time, and the
/// popup unsubscribes itself for good once it has shown the kill text.
pub struct HitTextPopupPlugin;

impl Plugin for HitTextPopupPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_damaged)
            .add_observer(on_killed)
            .add_systems(Update, popup_clear_system);
    }
}

#[derive(Component)]
pub struct HitTextPopup {
    /// The Health subject being watched (shared, not owned).
    pub health: Entity,
    /// The Text2d surface the popup writes into (also shared).
    pub text: Entity,
    pub hit_text: String,
    pub kill_text: String,
    pub duration_secs: f32,
    watching: bool,
}

impl HitTextPopup {
    /// Subscribes at construction — the activation-time analog of wiring the
    /// handlers up in OnEnable.
    pub fn new(
        health: Entity,
        text: Entity,
        hit_text: impl Into<String>,
        kill_text: impl Into<String>,
        duration_secs: f32,
    ) -> Self {
        HitTextPopup {
            health,
            text,
            hit_text: hit_text.into(),
            kill_text: kill_text.into(),
            duration_secs,
            watching: true,
        }
    }

    /// Stop reacting to the subject's notifications. Idempotent: calling this
    /// on a popup that already stopped (or never started) is a no-op.
    pub fn stop_observing(&mut self) {
        self.watching = false;
    }

    /// Re-subscribe to the subject. Also idempotent.
    pub fn start_observing(&mut self) {
        self.watching = true;
    }

    pub fn is_watching(&self) -> bool {
        self.watching
    }
}

/// The countdown until the popup text is cleared again.
///
/// This is the same insert-a-timer-component trick as a damage tint flash:
/// showing new text simply inserts a fresh PopupTimer, which REPLACES any
/// timer already on the entity. That replacement is the whole cancellation
/// story — at most one countdown is ever in flight, and the newest text wins.
#[derive(Component)]
pub struct PopupTimer(pub Timer);

fn on_damaged(
    trigger: On<Damaged>,
    popups: Query<(Entity, &HitTextPopup)>,
    mut texts: Query<&mut Text2d>,
    mut commands: Commands,
) {
    for (popup_entity, popup) in popups.iter() {
        if popup.health != trigger.entity || !popup.watching {
            continue;
        }
        let line = format!("{} {}", popup.hit_text, trigger.amount);
        show(popup_entity, popup, line, &mut texts, &mut commands);
    }
}

fn on_killed(
    trigger: On<Killed>,
    mut popups: Query<(Entity, &mut HitTextPopup)>,
    mut texts: Query<&mut Text2d>,
    mut commands: Commands,
) {
    for (popup_entity, mut popup) in popups.iter_mut() {
        if popup.health != trigger.entity || !popup.watching {
            continue;
        }
        let line = popup.kill_text.clone();
        show(popup_entity, &popup, line, &mut texts, &mut commands);

        // The subject is dead, so there is nothing left worth watching.
        // This covers both Damaged and Killed at once — every handler above
        // checks the same watching flag.
        popup.stop_observing();
    }
}

fn show(
    popup_entity: Entity,
    popup: &HitTextPopup,
    line: String,
    texts: &mut Query<&mut Text2d>,
    commands: &mut Commands,
) {
    if let Ok(mut text) = texts.get_mut(popup.text) {
        text.0 = line;
    }
    commands.entity(popup_entity).insert(PopupTimer(Timer::from_seconds(
        popup.duration_secs,
        TimerMode::Once,
    )));
}

/// Ticks the countdown and blanks the text when it runs out.
fn popup_clear_system(
    mut commands: Commands,
    mut popups: Query<(Entity, &HitTextPopup, &mut PopupTimer)>,
    mut texts: Query<&mut Text2d>,
    time: Res<Time>,
) {
    for (entity, popup, mut timer) in popups.iter_mut() {
        timer.0.tick(time.delta());
        if timer.0.is_finished() {
            commands.entity(entity).remove::<PopupTimer>();
            if let Ok(mut text) = texts.get_mut(popup.text) {
                text.0.clear();
            }
        }
    }
}
