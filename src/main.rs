use bevy::prelude::*;
use rand::Rng;

use crate::health::{Damage, Heal, Health, HealthPlugin, Inactive, Kill};
use crate::hit_text_popup::{HitTextPopup, HitTextPopupPlugin};
use crate::search_bot::{SearchBotPlugin, SearchBotSm};
use crate::settings::{Settings, SettingsPlugin};
use crate::target_assigner::TargetAssignerPlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins((
            SettingsPlugin,
            HealthPlugin,
            HitTextPopupPlugin,
            SearchBotPlugin,
            TargetAssignerPlugin,
        ))
        .add_systems(Startup, spawn_demo_scene)
        .add_systems(Update, demo_input_system)
        .run();
}

/// The dummy the keyboard bindings poke at.
#[derive(Component)]
struct DamageDummy;

fn spawn_demo_scene(mut commands: Commands, settings: Res<Settings>) {
    commands.spawn(Camera2d);

    // The punching-bag dummy: a Health subject the popup watches.
    let dummy = commands
        .spawn((
            Sprite {
                color: Color::srgb(0.35, 0.6, 0.9),
                custom_size: Some(Vec2::new(48.0, 64.0)),
                ..default()
            },
            Transform::from_xyz(200.0, 80.0, 0.0),
            Health::new(settings.starting_health, settings.max_health),
            DamageDummy,
        ))
        .id();

    // The popup's text surface floats above the dummy.
    let popup_text = commands
        .spawn((Text2d::new(""), Transform::from_xyz(200.0, 140.0, 0.5)))
        .id();

    commands.spawn(HitTextPopup::new(
        dummy,
        popup_text,
        settings.hit_text.clone(),
        settings.kill_text.clone(),
        settings.popup_duration_seconds,
    ));

    // A couple of scenery dummies with their own health, scattered with a
    // little jitter so the scene isn't a perfect grid.
    let mut rng = rand::thread_rng();
    for _ in 0..2 {
        let x = rng.gen_range(-320.0..-120.0);
        let y = rng.gen_range(-60.0..140.0);
        commands.spawn((
            Sprite {
                color: Color::srgb(0.5, 0.5, 0.55),
                custom_size: Some(Vec2::new(40.0, 52.0)),
                ..default()
            },
            Transform::from_xyz(x, y, 0.0),
            Health::new(settings.starting_health, settings.max_health),
        ));
    }

    // The search bot: a body sprite with an "eye" child whose color shows
    // which state the machine is in. Left-click anywhere to give it a target.
    let eye = commands
        .spawn((
            Sprite {
                color: Color::srgb(0.9, 0.9, 0.3),
                custom_size: Some(Vec2::splat(12.0)),
                ..default()
            },
            Transform::from_xyz(0.0, 10.0, 0.1),
        ))
        .id();
    let bot = commands
        .spawn((
            Sprite {
                color: Color::srgb(0.4, 0.4, 0.45),
                custom_size: Some(Vec2::new(36.0, 44.0)),
                ..default()
            },
            Transform::from_xyz(-100.0, -180.0, 0.0),
            SearchBotSm::new(eye),
        ))
        .id();
    commands.entity(bot).add_child(eye);

    info!("Demo controls: D = damage 30, H = heal 50, K = kill, S = log bot state, left click = send the bot searching");
}

/// Keyboard bindings that drive the Health subject. Skips dummies that have
/// already been killed — a deactivated entity is out of the simulation.
fn demo_input_system(
    keys: Res<ButtonInput<KeyCode>>,
    dummies: Query<(Entity, &Health), (With<DamageDummy>, Without<Inactive>)>,
    bots: Query<&SearchBotSm>,
    mut commands: Commands,
) {
    for (entity, health) in dummies.iter() {
        if keys.just_pressed(KeyCode::KeyD) {
            commands.trigger(Damage { entity, amount: 30 });
            info!("Damaged dummy (was at {})", health.current());
        }
        if keys.just_pressed(KeyCode::KeyH) {
            commands.trigger(Heal { entity, amount: 50 });
        }
        if keys.just_pressed(KeyCode::KeyK) {
            commands.trigger(Kill { entity });
        }
    }

    if keys.just_pressed(KeyCode::KeyS) {
        for sm in bots.iter() {
            info!("Search bot is in the {} state", sm.state_name());
        }
    }
}

mod health;
mod hit_text_popup;
mod search_bot;
mod settings;
mod target_assigner;
