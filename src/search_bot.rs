use bevy::prelude::*;

use crate::target_assigner::NewTargetAcquired;

/// State pattern for the search bot: the machine holds exactly one current
/// state, and every state implements the same four operations
/// {enter, exit, tick, fixed_tick}. Transitions always run exit() on the old
/// state, then enter() on the new one, in that order.
///
/// The Observer pattern works really well with the State pattern: the idle
/// state starts listening for NewTargetAcquired in enter() and stops in
/// exit(), so nothing ever has to poll for a target in tick().
pub struct SearchBotPlugin;

impl Plugin for SearchBotPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_new_target_acquired)
            .add_systems(Update, bot_tick_system)
            .add_systems(FixedUpdate, bot_fixed_tick_system);
    }
}

const IDLE_EYE_COLOR: Color = Color::BLACK;
const SEARCH_EYE_COLOR: Color = Color::srgb(0.9, 0.25, 0.2);
const SEARCH_SPEED: f32 = 125.0;
const ARRIVE_DISTANCE: f32 = 8.0;

/// Everything a state is allowed to touch while it runs: the eye sprite
/// (the bot's visual state indicator), the bot's transform, the frame delta,
/// and a slot for requesting a transition.
///
/// States can't call change_state() on the machine directly — the machine is
/// the thing dispatching to them, so that borrow is already taken. Instead a
/// state drops its requested successor into the context and the machine
/// performs the swap right after the dispatch returns.
pub struct BotCtx<'a> {
    pub eye: &'a mut Sprite,
    pub transform: &'a mut Transform,
    pub delta_secs: f32,
    next: Option<BotState>,
}

impl BotCtx<'_> {
    pub fn request_transition(&mut self, next: BotState) {
        self.next = Some(next);
    }
}

/// The capability set every state implements. tick/fixed_tick default to
/// no-ops because purely event-driven states (like Idle) need neither.
pub trait BotStateOps {
    fn enter(&mut self, ctx: &mut BotCtx);
    fn exit(&mut self, ctx: &mut BotCtx);
    fn tick(&mut self, _ctx: &mut BotCtx) {}
    fn fixed_tick(&mut self, _ctx: &mut BotCtx) {}
}

/// Tagged variant over the concrete states. An enum (rather than
/// Box<dyn BotStateOps>) keeps the machine Send + Sync for free and makes the
/// set of states a closed, compiler-checked list.
pub enum BotState {
    Idle(IdleState),
    Search(SearchState),
}

impl BotState {
    pub fn name(&self) -> &'static str {
        match self {
            BotState::Idle(_) => "Idle",
            BotState::Search(_) => "Search",
        }
    }

    fn enter(&mut self, ctx: &mut BotCtx) {
        match self {
            BotState::Idle(state) => state.enter(ctx),
            BotState::Search(state) => state.enter(ctx),
        }
    }

    fn exit(&mut self, ctx: &mut BotCtx) {
        match self {
            BotState::Idle(state) => state.exit(ctx),
            BotState::Search(state) => state.exit(ctx),
        }
    }

    fn tick(&mut self, ctx: &mut BotCtx) {
        match self {
            BotState::Idle(state) => state.tick(ctx),
            BotState::Search(state) => state.tick(ctx),
        }
    }

    fn fixed_tick(&mut self, ctx: &mut BotCtx) {
        match self {
            BotState::Idle(state) => state.fixed_tick(ctx),
            BotState::Search(state) => state.fixed_tick(ctx),
        }
    }

    // Notifications are forwarded to the current state only; states that
    // aren't listening ignore them.
    fn on_target_acquired(&mut self, ctx: &mut BotCtx, position: Vec3) {
        if let BotState::Idle(state) = self {
            state.on_target_acquired(ctx, position);
        }
    }
}

/// The state machine component. Holds the current state and the entity whose
/// Sprite color acts as the bot's "eye" indicator.
#[derive(Component)]
pub struct SearchBotSm {
    pub eye: Entity,
    state: BotState,
    entered: bool,
}

impl SearchBotSm {
    /// Bots start idle. enter() for the initial state runs on the first tick,
    /// once the eye sprite actually exists to write to.
    pub fn new(eye: Entity) -> Self {
        SearchBotSm {
            eye,
            state: BotState::Idle(IdleState::new()),
            entered: false,
        }
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn change_state(&mut self, ctx: &mut BotCtx, mut next: BotState) {
        self.state.exit(ctx);
        next.enter(ctx);
        self.state = next;
    }

    pub fn tick(&mut self, ctx: &mut BotCtx) {
        if !self.entered {
            self.state.enter(ctx);
            self.entered = true;
        }
        self.state.tick(ctx);
        self.apply_requested(ctx);
    }

    pub fn fixed_tick(&mut self, ctx: &mut BotCtx) {
        if !self.entered {
            return;
        }
        self.state.fixed_tick(ctx);
        self.apply_requested(ctx);
    }

    pub fn on_target_acquired(&mut self, ctx: &mut BotCtx, position: Vec3) {
        // Subscription happens in enter(), so a notification that arrives
        // before the first tick finds nobody listening.
        if !self.entered {
            return;
        }
        self.state.on_target_acquired(ctx, position);
        self.apply_requested(ctx);
    }

    fn apply_requested(&mut self, ctx: &mut BotCtx) {
        if let Some(next) = ctx.next.take() {
            self.change_state(ctx, next);
        }
    }
}

// ── Concrete states ─────────────────────────────────────────────────────────

/// Purely event-driven: does nothing per frame, just waits for a target.
pub struct IdleState {
    starting_eye_color: Option<Color>,
    listening: bool,
}

impl IdleState {
    pub fn new() -> Self {
        IdleState {
            starting_eye_color: None,
            listening: false,
        }
    }

    fn on_target_acquired(&mut self, ctx: &mut BotCtx, position: Vec3) {
        if !self.listening {
            return;
        }
        // The position only seeds the next state's destination — the
        // transition itself fires no matter what the value is.
        ctx.request_transition(BotState::Search(SearchState::new(position)));
    }
}

impl BotStateOps for IdleState {
    fn enter(&mut self, ctx: &mut BotCtx) {
        info!("STATE CHANGE - Idle");
        // Store the starting eye color so we can return to it on exit.
        self.starting_eye_color = Some(ctx.eye.color);
        ctx.eye.color = IDLE_EYE_COLOR;
        // Start listening for a new target.
        self.listening = true;
    }

    fn exit(&mut self, ctx: &mut BotCtx) {
        // Return the eye visual and stop listening.
        if let Some(color) = self.starting_eye_color.take() {
            ctx.eye.color = color;
        }
        self.listening = false;
    }
}

/// Drives toward the acquired position, then goes back to idle on arrival.
pub struct SearchState {
    target: Vec3,
    starting_eye_color: Option<Color>,
}

impl SearchState {
    pub fn new(target: Vec3) -> Self {
        SearchState {
            target,
            starting_eye_color: None,
        }
    }
}

impl BotStateOps for SearchState {
    fn enter(&mut self, ctx: &mut BotCtx) {
        info!("STATE CHANGE - Search");
        self.starting_eye_color = Some(ctx.eye.color);
        ctx.eye.color = SEARCH_EYE_COLOR;
    }

    fn exit(&mut self, ctx: &mut BotCtx) {
        if let Some(color) = self.starting_eye_color.take() {
            ctx.eye.color = color;
        }
    }

    fn tick(&mut self, ctx: &mut BotCtx) {
        let diff = self.target - ctx.transform.translation;
        if diff.length() <= ARRIVE_DISTANCE {
            ctx.request_transition(BotState::Idle(IdleState::new()));
            return;
        }
        // Clamp the step so we never overshoot and oscillate around the target.
        let step = (SEARCH_SPEED * ctx.delta_secs).min(diff.length());
        ctx.transform.translation += diff.normalize() * step;
    }
}

// ── Systems ─────────────────────────────────────────────────────────────────

fn bot_tick_system(
    mut bots: Query<(&mut SearchBotSm, &mut Transform)>,
    mut sprites: Query<&mut Sprite>,
    time: Res<Time>,
) {
    for (mut sm, mut transform) in bots.iter_mut() {
        let eye = sm.eye;
        let Ok(mut eye_sprite) = sprites.get_mut(eye) else {
            continue;
        };
        let mut ctx = BotCtx {
            eye: &mut *eye_sprite,
            transform: &mut *transform,
            delta_secs: time.delta_secs(),
            next: None,
        };
        sm.tick(&mut ctx);
    }
}

fn bot_fixed_tick_system(
    mut bots: Query<(&mut SearchBotSm, &mut Transform)>,
    mut sprites: Query<&mut Sprite>,
    time: Res<Time>,
) {
    // Res<Time> inside FixedUpdate reports the fixed timestep delta.
    for (mut sm, mut transform) in bots.iter_mut() {
        let eye = sm.eye;
        let Ok(mut eye_sprite) = sprites.get_mut(eye) else {
            continue;
        };
        let mut ctx = BotCtx {
            eye: &mut *eye_sprite,
            transform: &mut *transform,
            delta_secs: time.delta_secs(),
            next: None,
        };
        sm.fixed_tick(&mut ctx);
    }
}

fn on_new_target_acquired(
    trigger: On<NewTargetAcquired>,
    mut bots: Query<(&mut SearchBotSm, &mut Transform)>,
    mut sprites: Query<&mut Sprite>,
) {
    for (mut sm, mut transform) in bots.iter_mut() {
        let eye = sm.eye;
        let Ok(mut eye_sprite) = sprites.get_mut(eye) else {
            continue;
        };
        // No frame time passes during a notification dispatch.
        let mut ctx = BotCtx {
            eye: &mut *eye_sprite,
            transform: &mut *transform,
            delta_secs: 0.0,
            next: None,
        };
        sm.on_target_acquired(&mut ctx, trigger.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const EYE_STARTING_COLOR: Color = Color::srgb(0.2, 0.8, 0.3);

    struct Fixture {
        app: App,
        bot: Entity,
        eye: Entity,
    }

    fn fixture() -> Fixture {
        let mut app = App::new();
        app.add_plugins(SearchBotPlugin);
        app.init_resource::<Time>();
        let eye = app
            .world_mut()
            .spawn((
                Sprite {
                    color: EYE_STARTING_COLOR,
                    custom_size: Some(Vec2::splat(10.0)),
                    ..default()
                },
                Transform::from_xyz(0.0, 8.0, 0.1),
            ))
            .id();
        let bot = app
            .world_mut()
            .spawn((Transform::from_xyz(0.0, 0.0, 0.0), SearchBotSm::new(eye)))
            .id();
        Fixture { app, bot, eye }
    }

    impl Fixture {
        fn step(&mut self, seconds: f32) {
            self.app
                .world_mut()
                .resource_mut::<Time>()
                .advance_by(Duration::from_secs_f32(seconds));
            self.app.update();
        }

        fn acquire_target(&mut self, position: Vec3) {
            self.app.world_mut().trigger(NewTargetAcquired { position });
        }

        fn state_name(&self) -> &'static str {
            self.app
                .world()
                .get::<SearchBotSm>(self.bot)
                .unwrap()
                .state_name()
        }

        fn eye_color(&self) -> Color {
            self.app.world().get::<Sprite>(self.eye).unwrap().color
        }

        fn bot_position(&self) -> Vec3 {
            self.app
                .world()
                .get::<Transform>(self.bot)
                .unwrap()
                .translation
        }
    }

    #[test]
    fn starts_idle_with_idle_eye_color() {
        let mut f = fixture();
        f.step(0.0);

        assert_eq!(f.state_name(), "Idle");
        assert_eq!(f.eye_color(), IDLE_EYE_COLOR);
    }

    #[test]
    fn target_notification_transitions_to_search_once() {
        let mut f = fixture();
        f.step(0.0);

        f.acquire_target(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(f.state_name(), "Search");

        // A second notification while searching changes nothing — only the
        // idle state listens for targets.
        f.acquire_target(Vec3::new(500.0, 0.0, 0.0));
        assert_eq!(f.state_name(), "Search");
    }

    #[test]
    fn transition_fires_regardless_of_position_value() {
        let mut f = fixture();
        f.step(0.0);

        f.acquire_target(Vec3::ZERO);
        assert_eq!(f.state_name(), "Search");
    }

    #[test]
    fn idle_exit_restores_the_saved_eye_color() {
        let mut f = fixture();
        f.step(0.0);
        assert_eq!(f.eye_color(), IDLE_EYE_COLOR);

        // Idle's exit puts the pre-idle color back before Search's enter
        // saves it and paints the search color over it.
        f.acquire_target(Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(f.eye_color(), SEARCH_EYE_COLOR);
    }

    #[test]
    fn search_moves_toward_target_and_returns_to_idle() {
        let mut f = fixture();
        f.step(0.0);
        f.acquire_target(Vec3::new(100.0, 0.0, 0.0));

        f.step(0.2);
        let after_one_step = f.bot_position();
        assert!(after_one_step.x > 0.0);
        assert!(after_one_step.x < 100.0);

        // Plenty of frames to cover the remaining distance.
        for _ in 0..20 {
            f.step(0.2);
        }
        assert_eq!(f.state_name(), "Idle");
        assert!((f.bot_position().x - 100.0).abs() <= ARRIVE_DISTANCE);

        // Back in idle: the eye indicator shows idle again, and the color
        // save/restore round-trip never leaked the original color.
        assert_eq!(f.eye_color(), IDLE_EYE_COLOR);
    }

    #[test]
    fn eye_color_round_trips_through_both_states() {
        let mut f = fixture();
        f.step(0.0);
        // Target already inside ARRIVE_DISTANCE: the next tick exits Search
        // and re-enters Idle, exercising save/restore in both states.
        f.acquire_target(Vec3::new(3.0, 0.0, 0.0));
        f.step(0.1);
        assert_eq!(f.state_name(), "Idle");
        assert_eq!(f.eye_color(), IDLE_EYE_COLOR);
    }

    #[test]
    fn notification_before_first_tick_is_ignored() {
        let mut f = fixture();
        // No update yet: the initial state hasn't entered, so it isn't
        // subscribed to the notifier.
        f.acquire_target(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(f.state_name(), "Idle");

        f.step(0.0);
        assert_eq!(f.state_name(), "Idle");
    }

    #[test]
    fn fixed_tick_is_a_no_op_in_both_states() {
        let mut f = fixture();
        f.step(0.0);
        let before = f.bot_position();

        // Run the FixedUpdate schedule directly; neither state does anything
        // per physics step.
        f.app.world_mut().run_schedule(FixedUpdate);
        assert_eq!(f.bot_position(), before);
        assert_eq!(f.state_name(), "Idle");
    }
}
