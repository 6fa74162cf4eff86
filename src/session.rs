use cgmath::{point3, EuclideanSpace, Point3};

use crate::{
    animation::{AnimationPlayer, ClipLibrary},
    baseline::AssetBaseline,
    camera::{OrbitControls, PerspectiveCamera},
    chat::{Speaker, Transcript},
    data::LoadedModel,
    editor::{CursorPolicy, Editor},
    exercises::Exercise,
    handles::NodeId,
    loader::LoadError,
    motion::Motion,
    scene::{NodeKind, SceneGraph},
    script::{Bindings, ExecError, Executor, MessageLevel},
};

#[derive(Debug)]
pub struct SessionState {
    pub selected_exercise: usize,
    pub model_root: Option<NodeId>,
    pub player: Option<AnimationPlayer>,
    pub solution_revealed: bool,

    pub scene: SceneGraph,
    pub camera: PerspectiveCamera,
    pub controls: Option<OrbitControls>,
    pub clips: ClipLibrary,
    pub motions: Vec<Motion>,
    pub baseline: AssetBaseline,
}

impl SessionState {
    pub fn new(baseline: AssetBaseline, width: u32, height: u32) -> Self {
        Self {
            selected_exercise: 0,
            model_root: None,
            player: None,
            solution_revealed: false,

            scene: SceneGraph::with_default_lighting("Main Scene"),
            camera: PerspectiveCamera::new(
                "Main Camera".to_string(),
                point3(0.0, 0.0, 5.0),
                75.0,
                width,
                height,
                0.1,
                1000.0,
            ),
            controls: None,
            clips: ClipLibrary::default(),
            motions: Vec::new(),
            baseline,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model_root.is_some()
    }

    pub fn model_position(&self) -> Option<Point3<f32>> {
        let node = self.scene.get(self.model_root?)?;
        Some(Point3::from_vec(node.transform.translation))
    }

    pub fn reset_additions(&mut self) {
        let removed = self.scene.prune_to_baseline();
        if removed > 0 {
            log::debug!("Removed {} added nodes", removed);
        }
        self.controls = None;
    }

    pub fn reset_camera(&mut self) {
        let pose = self.baseline.camera;
        let target = if pose.look_at_model {
            self.model_position().unwrap_or_else(Point3::origin)
        } else {
            Point3::origin()
        };
        self.camera.set_position(pose.position);
        self.camera.look_at(target);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport_size(width, height);
    }

    pub fn bindings(&mut self) -> Bindings<'_> {
        Bindings {
            allowed: &self.baseline.bindings,
            scene: &mut self.scene,
            lib: &self.clips,
            model: self.model_root,
            mixer: self.player.as_mut(),
            camera: &mut self.camera,
            controls: &mut self.controls,
            motions: &mut self.motions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealAffordance {
    pub exercise: usize,
}

/// Maps exercise selection, code execution and solution reveals onto the
/// session state and the editor.
pub struct ExerciseSession<E: Editor> {
    pub state: SessionState,
    pub editor: E,
    pub transcript: Transcript,
    catalog: &'static [Exercise],
    executor: Box<dyn Executor>,
    reveal: Option<RevealAffordance>,
}

impl<E: Editor> ExerciseSession<E> {
    pub fn new(
        state: SessionState,
        editor: E,
        executor: Box<dyn Executor>,
        catalog: &'static [Exercise],
    ) -> Self {
        let mut session = Self {
            state,
            editor,
            transcript: Transcript::default(),
            catalog,
            executor,
            reveal: None,
        };
        session.select_exercise(0);
        session
    }

    pub fn catalog(&self) -> &'static [Exercise] {
        self.catalog
    }

    pub fn current_exercise(&self) -> Option<&'static Exercise> {
        self.catalog.get(self.state.selected_exercise)
    }

    pub fn reveal_affordance(&self) -> Option<RevealAffordance> {
        self.reveal
    }

    /// Resets the scene to the exercise baseline and loads the starter code.
    /// Every step is a full reset, so selecting the same index twice is the
    /// same as selecting it once.
    pub fn select_exercise(&mut self, index: usize) {
        let Some(exercise) = self.catalog.get(index) else {
            log::warn!(
                "Exercise {} does not exist ({} in catalog)",
                index,
                self.catalog.len()
            );
            return;
        };

        self.state.reset_additions();

        if let Some(root) = self.state.model_root {
            let baseline = self.state.baseline.model_transform();
            if let Some(node) = self.state.scene.get_mut(root) {
                node.transform = baseline;
            }

            if let Some(mut previous) = self.state.player.take() {
                previous.stop_all();
                self.state.player = Some(AnimationPlayer::playing_all(root, &self.state.clips));
                // Motions belong to the player generation that was just discarded.
                self.state.motions.clear();
            }

            self.state.reset_camera();
        }

        self.editor.set_text(exercise.starter_code, CursorPolicy::Start);

        self.state.solution_revealed = false;
        self.reveal = Some(RevealAffordance { exercise: index });

        self.state.selected_exercise = index;
        log::info!("Selected {}", exercise.title);
    }

    pub fn reveal_solution(&mut self) -> bool {
        let Some(affordance) = self.reveal.take() else {
            return false;
        };

        if let Some(exercise) = self.catalog.get(affordance.exercise) {
            self.editor
                .set_text(exercise.solution_code, CursorPolicy::Start);
        }
        self.state.solution_revealed = true;
        true
    }

    /// Runs the editor text once. Failures are reported to the transcript and
    /// the log here; the returned result is only for the caller's notification.
    pub fn execute(&mut self) -> Result<(), ExecError> {
        let source = self.editor.text();
        let mut output = Vec::new();

        let result = {
            let mut bindings = self.state.bindings();
            self.executor.run(&source, &mut bindings, &mut output)
        };

        for message in output {
            match message.level {
                MessageLevel::Info => log::info!("script: {}", message.text),
                MessageLevel::Warn => log::warn!("script: {}", message.text),
            }
            self.transcript.push(Speaker::System, message.text);
        }

        match &result {
            Ok(()) => log::debug!("Script finished"),
            Err(e) => {
                log::error!("Error executing user code: {}", e);
                self.transcript
                    .push(Speaker::System, format!("Error in your code: {}", e));
            }
        }

        result
    }

    pub fn on_model_loaded(&mut self, model: &LoadedModel) {
        if self.state.model_root.is_some() {
            log::warn!("Ignoring {:?}: a model is already loaded", model.path);
            return;
        }

        let transform = self.state.baseline.model_transform();
        let root = self.state.scene.add(&model.name, NodeKind::Model, transform);
        self.state.scene.mark_permanent(root);

        self.state.model_root = Some(root);
        self.state.clips = model.clips.clone();
        self.state.player = Some(AnimationPlayer::playing_all(root, &self.state.clips));
        self.state.reset_camera();

        log::info!(
            "Model {} ready with clips {:?}",
            model.name,
            self.state.clips.names()
        );
    }

    pub fn on_load_failed(&mut self, error: &LoadError) {
        log::error!("Error loading GLTF model: {}", error);
        self.transcript.push(
            Speaker::System,
            format!("The model could not be loaded: {}", error),
        );
    }
}
