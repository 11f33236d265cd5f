use bevy::{
    asset::RenderAssetUsages,
    mesh::PrimitiveTopology,
    prelude::*,
    tasks::{AsyncComputeTaskPool, Task, block_on, futures_lite::future},
};

use crate::{
    error::Result,
    flatten::FlatBuffer,
    pipeline::{FractalConfig, generate},
};

/// System sets for the point-cloud pipeline.
///
/// ```text
/// TriplexCloudSet::Spawn  →  [async compute]  →  TriplexCloudSet::Generate  →  [your systems]  →  TriplexCloudSet::Upload
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TriplexCloudSet {
    /// Spawns an async compute task for each queued cloud.
    Spawn,
    /// Polls async tasks and inserts [`GeneratedCloud`] on completion.
    Generate,
    /// Uploads [`GeneratedCloud`] into a point-list [`Mesh3d`].
    Upload,
}

/// A fractal point cloud to be built from its [`FractalConfig`].
///
/// Adding this component, or mutating it later, schedules a rebuild.
#[derive(Component, Debug, Clone, Default)]
#[require(Transform)]
pub struct FractalCloud {
    pub config: FractalConfig,
}

impl FractalCloud {
    pub fn new(config: FractalConfig) -> Self {
        Self { config }
    }
}

/// Marker component added to [`FractalCloud`] entities waiting to be built.
#[derive(Component)]
pub struct QueuedCloud;

/// Holds the in-flight async build for a [`FractalCloud`].
#[derive(Component)]
pub struct ComputeTask(Task<Result<FlatBuffer>>);

/// The finished vertex buffer, present between [`TriplexCloudSet::Generate`] and
/// [`TriplexCloudSet::Upload`].
#[derive(Component, Debug, Clone)]
pub struct GeneratedCloud(pub FlatBuffer);

/// Runtime configuration for the point-cloud pipeline.
#[derive(Resource)]
pub struct TriplexCloudConfig {
    /// Maximum number of async builds spawned per frame. Default: `2`.
    pub max_tasks_per_frame: usize,
}

impl Default for TriplexCloudConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_frame: 2,
        }
    }
}

/// Bevy plugin that turns [`FractalCloud`] components into point-list meshes.
///
/// ```text
/// FractalCloud added or changed
///   → QueuedCloud inserted          (queue_changed_clouds)
///   → ComputeTask spawned           (TriplexCloudSet::Spawn)
///   → [async compute runs generate]
///   → GeneratedCloud inserted       (TriplexCloudSet::Generate)
///   → Mesh3d inserted               (TriplexCloudSet::Upload)
///   → QueuedCloud + GeneratedCloud removed
/// ```
///
/// A failed build is logged and dropped; the previous mesh, if any, stays.
pub struct TriplexCloudPlugin {
    /// Initial value for [`TriplexCloudConfig::max_tasks_per_frame`].
    pub max_tasks_per_frame: usize,
}

impl Default for TriplexCloudPlugin {
    fn default() -> Self {
        Self {
            max_tasks_per_frame: TriplexCloudConfig::default().max_tasks_per_frame,
        }
    }
}

impl Plugin for TriplexCloudPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(TriplexCloudConfig {
            max_tasks_per_frame: self.max_tasks_per_frame,
        });

        #[cfg(feature = "auto_queue")]
        app.configure_sets(
            Update,
            (
                TriplexCloudSet::Spawn,
                TriplexCloudSet::Generate,
                TriplexCloudSet::Upload,
            )
                .chain(),
        )
        .add_systems(
            Update,
            (
                queue_changed_clouds.before(TriplexCloudSet::Spawn),
                spawn_cloud_tasks.in_set(TriplexCloudSet::Spawn),
                poll_cloud_tasks.in_set(TriplexCloudSet::Generate),
                upload_cloud.in_set(TriplexCloudSet::Upload),
            ),
        );
    }
}

/// Queues every added or mutated [`FractalCloud`].
///
/// A cloud that changes while its build is in flight drops the old task.
fn queue_changed_clouds(
    mut commands: Commands,
    query: Query<Entity, Changed<FractalCloud>>,
) {
    for entity in query.iter() {
        commands
            .entity(entity)
            .insert(QueuedCloud)
            .remove::<(ComputeTask, GeneratedCloud)>();
    }
}

/// Spawns async builds for [`QueuedCloud`]s, up to [`TriplexCloudConfig::max_tasks_per_frame`] per frame.
fn spawn_cloud_tasks(
    mut commands: Commands,
    config: Res<TriplexCloudConfig>,
    query: Query<
        (Entity, &FractalCloud),
        (With<QueuedCloud>, Without<ComputeTask>, Without<GeneratedCloud>),
    >,
) {
    let task_pool = AsyncComputeTaskPool::get();

    for (entity, cloud) in query.iter().take(config.max_tasks_per_frame) {
        let fractal = cloud.config;
        tracing::debug!(
            ?entity,
            granularity = fractal.granularity.get(),
            "Spawning cloud build"
        );

        let task = task_pool.spawn(async move { generate(&fractal) });

        commands.entity(entity).insert(ComputeTask(task));
    }
}

/// Polls in-flight [`ComputeTask`]s and inserts [`GeneratedCloud`] on success.
///
/// Non-blocking: unfinished tasks are retried next frame.
fn poll_cloud_tasks(mut commands: Commands, mut query: Query<(Entity, &mut ComputeTask)>) {
    for (entity, mut compute_task) in query.iter_mut() {
        let Some(result) = block_on(future::poll_once(&mut compute_task.0)) else {
            continue;
        };

        match result {
            Ok(buffer) => {
                commands
                    .entity(entity)
                    .insert(GeneratedCloud(buffer))
                    .remove::<ComputeTask>();
            }
            Err(err) => {
                tracing::warn!(?entity, %err, "Fractal cloud build failed");
                commands
                    .entity(entity)
                    .remove::<(ComputeTask, QueuedCloud)>();
            }
        }
    }
}

/// Uploads a [`GeneratedCloud`] into a point-list [`Mesh3d`], then removes
/// [`GeneratedCloud`] and [`QueuedCloud`].
fn upload_cloud(
    mut commands: Commands,
    query: Query<(Entity, &GeneratedCloud), With<QueuedCloud>>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    for (entity, generated) in query.iter() {
        let mesh = point_cloud_mesh(&generated.0);

        commands
            .entity(entity)
            .insert(Mesh3d(meshes.add(mesh)))
            .remove::<(GeneratedCloud, QueuedCloud)>();
    }
}

/// Builds a point-list mesh whose positions are the buffer's triples.
pub fn point_cloud_mesh(buffer: &FlatBuffer) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::PointList, RenderAssetUsages::RENDER_WORLD);
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, buffer.positions());
    mesh
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::tasks::TaskPool;

    use super::*;
    use crate::{grid::Granularity, types::Point};

    fn cloud(granularity: u32) -> FractalCloud {
        FractalCloud::new(FractalConfig::new(Granularity::new(granularity)))
    }

    /// An app running the whole plugin with just enough infrastructure for meshes.
    fn headless_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Mesh>()
            .add_plugins(TriplexCloudPlugin::default());
        app
    }

    /// Updates until `done` holds, giving the async pool time between frames.
    fn update_until(app: &mut App, mut done: impl FnMut(&App) -> bool) -> bool {
        for _ in 0..500 {
            app.update();
            if done(app) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn mesh_has_one_vertex_per_point() {
        let buffer = crate::flatten::flatten(&[Point::new(1., 2., 3.), Point::new(4., 5., 6.)]);
        let mesh = point_cloud_mesh(&buffer);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::PointList);
        assert_eq!(mesh.count_vertices(), 2);
    }

    #[test]
    fn adding_a_cloud_queues_it() {
        let mut app = App::new();
        app.add_systems(Update, queue_changed_clouds);

        let entity = app.world_mut().spawn(cloud(2)).id();
        app.update();

        assert!(app.world().entity(entity).contains::<QueuedCloud>());
    }

    #[test]
    fn changing_a_cloud_requeues_it_and_drops_the_build() {
        let mut app = App::new();
        app.add_systems(Update, queue_changed_clouds);

        let entity = app.world_mut().spawn(cloud(2)).id();
        app.update();

        // Stand in for a build that is still running.
        let pool = AsyncComputeTaskPool::get_or_init(TaskPool::default);
        let pending = pool.spawn(std::future::pending::<Result<FlatBuffer>>());
        app.world_mut()
            .entity_mut(entity)
            .remove::<QueuedCloud>()
            .insert(ComputeTask(pending));

        // Nothing changed, nothing requeued.
        app.update();
        assert!(!app.world().entity(entity).contains::<QueuedCloud>());
        assert!(app.world().entity(entity).contains::<ComputeTask>());

        app.world_mut()
            .get_mut::<FractalCloud>(entity)
            .unwrap()
            .config
            .exponent = 8.;
        app.update();

        let entity_ref = app.world().entity(entity);
        assert!(entity_ref.contains::<QueuedCloud>());
        assert!(!entity_ref.contains::<ComputeTask>());
        assert!(!entity_ref.contains::<GeneratedCloud>());
    }

    #[test]
    fn cloud_is_uploaded_as_point_mesh() {
        let mut app = headless_app();
        let entity = app.world_mut().spawn(cloud(3)).id();

        let uploaded = update_until(&mut app, |app| {
            app.world().entity(entity).contains::<Mesh3d>()
        });
        assert!(uploaded);

        let entity_ref = app.world().entity(entity);
        assert!(!entity_ref.contains::<QueuedCloud>());
        assert!(!entity_ref.contains::<GeneratedCloud>());

        let handle = entity_ref.get::<Mesh3d>().unwrap().0.clone();
        let meshes = app.world().resource::<Assets<Mesh>>();
        let mesh = meshes.get(&handle).unwrap();
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::PointList);
        assert_eq!(mesh.count_vertices(), 4 * 4 * 4);
    }

    #[test]
    fn failed_build_is_dequeued_and_keeps_previous_mesh() {
        let mut app = headless_app();
        let previous = app
            .world_mut()
            .resource_mut::<Assets<Mesh>>()
            .add(point_cloud_mesh(&FlatBuffer::default()));
        let entity = app
            .world_mut()
            .spawn((cloud(u32::MAX), Mesh3d(previous.clone())))
            .id();

        let dequeued = update_until(&mut app, |app| {
            !app.world().entity(entity).contains::<QueuedCloud>()
        });
        assert!(dequeued);

        let entity_ref = app.world().entity(entity);
        assert!(!entity_ref.contains::<ComputeTask>());
        assert!(!entity_ref.contains::<GeneratedCloud>());
        assert_eq!(entity_ref.get::<Mesh3d>().unwrap().0, previous);
    }
}
