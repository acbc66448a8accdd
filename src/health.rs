use bevy::prelude::*;

/// Health is the 'Subject' in our Observer pattern. Other code watches for
/// the Damaged / Healed / Killed notifications and reacts, instead of polling
/// the current value every frame. The notifications carry the amount involved,
/// which is handy for UI, pop-up damage text, audio, etc.
pub struct HealthPlugin;

impl Plugin for HealthPlugin {
    fn build(&self, app: &mut App) {
        // No per-frame systems here — everything is event-driven.
        // Observers run immediately when their event is triggered, in the
        // order they were registered, on the thread that triggered them.
        app.add_observer(on_damage)
            .add_observer(on_heal)
            .add_observer(on_kill);
    }
}

/// Per-entity health state.
///
/// The current value is clamped to max on every write, but there is
/// deliberately NO lower clamp: a big hit can drive it negative, and the kill
/// check fires right after. Observers only ever see the damage amount in the
/// notification payload, not the raw value, so the negative value is benign.
#[derive(Component, Debug)]
pub struct Health {
    starting: i32,
    max: i32,
    current: i32,
}

impl Health {
    /// Entity-activation initialization: current health starts at `starting`
    /// (clamped so a misconfigured starting value can't exceed max).
    pub fn new(starting: i32, max: i32) -> Self {
        Health {
            starting,
            max,
            current: starting.min(max),
        }
    }

    pub fn starting(&self) -> i32 {
        self.starting
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    // All mutation funnels through here so the upper clamp can't be skipped.
    fn set_current(&mut self, value: i32) {
        self.current = value.min(self.max);
    }
}

/// Marks an entity that has been killed and removed from the active
/// simulation. The entity is NOT despawned — its components stick around —
/// systems just skip it with Without<Inactive>.
#[derive(Component)]
pub struct Inactive;

// ── Request events ──────────────────────────────────────────────────────────
// These are the operations you perform ON the subject. Trigger one with
// commands.trigger(..) and the matching observer below applies it, then fans
// out the corresponding notification.

#[derive(Event)]
pub struct Damage {
    pub entity: Entity,
    pub amount: i32,
}

#[derive(Event)]
pub struct Heal {
    pub entity: Entity,
    pub amount: i32,
}

#[derive(Event)]
pub struct Kill {
    pub entity: Entity,
}

// ── Notifications ───────────────────────────────────────────────────────────
// These are what observers subscribe to. Each fires exactly once per request,
// synchronously, after the health value has been updated.

/// Fired after damage was applied. The payload is the damage amount,
/// not the resulting health.
#[derive(Event)]
pub struct Damaged {
    pub entity: Entity,
    pub amount: i32,
}

/// Fired after healing was applied (post-clamp, so the amount may be larger
/// than the health actually gained).
#[derive(Event)]
pub struct Healed {
    pub entity: Entity,
    pub amount: i32,
}

/// Fired when the entity is killed. No payload beyond the entity —
/// "you're dead" needs no amount.
#[derive(Event)]
pub struct Killed {
    pub entity: Entity,
}

// ── Observers ───────────────────────────────────────────────────────────────

fn on_damage(trigger: On<Damage>, mut healths: Query<&mut Health>, mut commands: Commands) {
    let Ok(mut health) = healths.get_mut(trigger.entity) else {
        return;
    };

    let damaged_to = health.current - trigger.amount;
    health.set_current(damaged_to);
    commands.trigger(Damaged {
        entity: trigger.entity,
        amount: trigger.amount,
    });

    // The Damaged trigger above is queued before this one, so observers
    // always hear Damaged before Killed for the same hit.
    if health.current <= 0 {
        commands.trigger(Kill {
            entity: trigger.entity,
        });
    }
}

fn on_heal(trigger: On<Heal>, mut healths: Query<&mut Health>, mut commands: Commands) {
    let Ok(mut health) = healths.get_mut(trigger.entity) else {
        return;
    };

    // Note: healing a dead entity is not guarded against at this layer.
    // If a reviving mechanic ever needs that rule, it belongs in the caller.
    let healed_to = health.current + trigger.amount;
    health.set_current(healed_to);
    commands.trigger(Healed {
        entity: trigger.entity,
        amount: trigger.amount,
    });
}

fn on_kill(trigger: On<Kill>, mut commands: Commands) {
    commands.trigger(Killed {
        entity: trigger.entity,
    });

    // Deactivate rather than despawn: the health data survives, the entity
    // just drops out of the active simulation and stops being drawn.
    commands
        .entity(trigger.entity)
        .insert((Inactive, Visibility::Hidden));
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every notification so tests can assert exact delivery counts.
    #[derive(Resource, Default)]
    struct EventLog {
        damaged: Vec<i32>,
        healed: Vec<i32>,
        killed: u32,
    }

    fn record_damaged(trigger: On<Damaged>, mut log: ResMut<EventLog>) {
        log.damaged.push(trigger.amount);
    }

    fn record_healed(trigger: On<Healed>, mut log: ResMut<EventLog>) {
        log.healed.push(trigger.amount);
    }

    fn record_killed(_trigger: On<Killed>, mut log: ResMut<EventLog>) {
        log.killed += 1;
    }

    fn test_app() -> (App, Entity) {
        let mut app = App::new();
        app.add_plugins(HealthPlugin);
        app.init_resource::<EventLog>();
        app.add_observer(record_damaged);
        app.add_observer(record_healed);
        app.add_observer(record_killed);
        let entity = app.world_mut().spawn(Health::new(100, 100)).id();
        (app, entity)
    }

    fn current(app: &App, entity: Entity) -> i32 {
        app.world().get::<Health>(entity).unwrap().current()
    }

    #[test]
    fn starting_health_is_clamped_to_max() {
        let health = Health::new(150, 100);
        assert_eq!(health.current(), 100);
        assert_eq!(health.starting(), 150);
    }

    #[test]
    fn damage_reduces_health_and_notifies_once() {
        let (mut app, entity) = test_app();

        app.world_mut().trigger(Damage { entity, amount: 30 });
        app.update();

        assert_eq!(current(&app, entity), 70);
        let log = app.world().resource::<EventLog>();
        assert_eq!(log.damaged, vec![30]);
        assert_eq!(log.killed, 0);
    }

    #[test]
    fn heal_is_clamped_to_max_health() {
        let (mut app, entity) = test_app();

        app.world_mut().trigger(Damage { entity, amount: 30 });
        app.world_mut().trigger(Heal { entity, amount: 50 });
        app.update();

        // 70 + 50 clamps at 100; the notification still carries the full 50.
        assert_eq!(current(&app, entity), 100);
        let log = app.world().resource::<EventLog>();
        assert_eq!(log.healed, vec![50]);
    }

    #[test]
    fn lethal_damage_kills_and_deactivates() {
        let (mut app, entity) = test_app();

        app.world_mut().trigger(Damage {
            entity,
            amount: 150,
        });
        app.update();

        // No lower clamp: the value goes negative before the kill check runs.
        assert_eq!(current(&app, entity), -50);
        assert!(app.world().get::<Inactive>(entity).is_some());
        let log = app.world().resource::<EventLog>();
        assert_eq!(log.damaged, vec![150]);
        assert_eq!(log.killed, 1);
    }

    #[test]
    fn full_damage_heal_kill_scenario() {
        let (mut app, entity) = test_app();

        app.world_mut().trigger(Damage { entity, amount: 30 });
        app.update();
        assert_eq!(current(&app, entity), 70);

        app.world_mut().trigger(Heal { entity, amount: 50 });
        app.update();
        assert_eq!(current(&app, entity), 100);

        app.world_mut().trigger(Damage {
            entity,
            amount: 150,
        });
        app.update();
        assert_eq!(current(&app, entity), -50);
        assert!(app.world().get::<Inactive>(entity).is_some());

        let log = app.world().resource::<EventLog>();
        assert_eq!(log.damaged, vec![30, 150]);
        assert_eq!(log.healed, vec![50]);
        assert_eq!(log.killed, 1);
    }

    #[test]
    fn exact_lethal_damage_also_kills() {
        let (mut app, entity) = test_app();

        app.world_mut().trigger(Damage {
            entity,
            amount: 100,
        });
        app.update();

        assert_eq!(current(&app, entity), 0);
        assert_eq!(app.world().resource::<EventLog>().killed, 1);
    }

    #[test]
    fn requests_for_entities_without_health_are_ignored() {
        let (mut app, _) = test_app();
        let bare = app.world_mut().spawn_empty().id();

        app.world_mut().trigger(Damage {
            entity: bare,
            amount: 10,
        });
        app.update();

        let log = app.world().resource::<EventLog>();
        assert!(log.damaged.is_empty());
        assert_eq!(log.killed, 0);
    }
}
