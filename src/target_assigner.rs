use bevy::prelude::*;
use bevy::window::PrimaryWindow;

/// Broadcast when the player clicks somewhere in the world. This is the
/// external notifier the search bot's idle state listens to — the bot never
/// touches mouse input itself.
#[derive(Event)]
pub struct NewTargetAcquired {
    pub position: Vec3,
}

pub struct TargetAssignerPlugin;

impl Plugin for TargetAssignerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, assign_target_on_click);
    }
}

fn assign_target_on_click(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<Camera2d>>,
    mut commands: Commands,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }
    let Some(clicked) = cursor_world_position(&windows, &cameras) else {
        return;
    };
    let position = clicked.extend(0.0);
    info!("New target acquired at {position:?}");
    commands.trigger(NewTargetAcquired { position });
}

fn cursor_world_position(
    windows: &Query<&Window, With<PrimaryWindow>>,
    cameras: &Query<(&Camera, &GlobalTransform), With<Camera2d>>,
) -> Option<Vec2> {
    let window = windows.single().ok()?;
    let cursor = window.cursor_position()?;
    let (camera, camera_transform) = cameras.single().ok()?;
    let ray = camera.viewport_to_world(camera_transform, cursor).ok()?;
    Some(ray.origin.truncate())
}
