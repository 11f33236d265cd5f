use bevy::prelude::*;
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};
use bevy_triplex_cloud::{
    FractalConfig, TriplexCloudPlugin, grid::Granularity, plugin::FractalCloud,
    triplex::ArctanMode,
};

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            TriplexCloudPlugin::default(),
            PanOrbitCameraPlugin,
        ))
        .add_systems(Startup, setup)
        .add_systems(Update, rebuild_on_key)
        .run();
}

fn setup(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    bevy::log::info!("Bulb Example: Up/Down changes the exponent, Q toggles quadrant arctan");

    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera::default(),
        Transform::from_xyz(0., 0., 12.).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        FractalCloud::new(FractalConfig::new(Granularity::new(48))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::WHITE,
            unlit: true,
            ..Default::default()
        })),
    ));
}

fn rebuild_on_key(keyboard: Res<ButtonInput<KeyCode>>, mut clouds: Query<&mut FractalCloud>) {
    for mut cloud in clouds.iter_mut() {
        if keyboard.just_pressed(KeyCode::ArrowUp) {
            cloud.config.exponent += 1.;
        }
        if keyboard.just_pressed(KeyCode::ArrowDown) {
            cloud.config.exponent = (cloud.config.exponent - 1.).max(1.);
        }
        if keyboard.just_pressed(KeyCode::KeyQ) {
            cloud.config.arctan = match cloud.config.arctan {
                ArctanMode::Single => ArctanMode::Quadrant,
                ArctanMode::Quadrant => ArctanMode::Single,
            };
        }
    }
}
