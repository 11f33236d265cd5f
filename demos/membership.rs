use bevy::prelude::*;
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};
use bevy_triplex_cloud::{
    FractalConfig, TriplexCloudPlugin,
    grid::Granularity,
    pipeline::CloudMode,
    plugin::{FractalCloud, GeneratedCloud, TriplexCloudSet},
    triplex::IterationConfig,
};

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            TriplexCloudPlugin {
                max_tasks_per_frame: 1,
            },
            PanOrbitCameraPlugin,
        ))
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            report
                .after(TriplexCloudSet::Generate)
                .before(TriplexCloudSet::Upload),
        )
        .run();
}

fn setup(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera::default(),
        Transform::from_xyz(0., 1.5, 4.).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let iteration = IterationConfig::default()
        .with_exponent(8.)
        .with_max_iterations(12);

    commands.spawn((
        FractalCloud::new(
            FractalConfig::new(Granularity::new(96))
                .with_span(2.4)
                .with_mode(CloudMode::Membership(iteration)),
        ),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.6, 0.8, 1.),
            unlit: true,
            ..Default::default()
        })),
    ));
}

fn report(query: Query<&GeneratedCloud, Added<GeneratedCloud>>) {
    for cloud in query.iter() {
        bevy::log::info!("Bounded points: {}", cloud.0.point_count());
    }
}
