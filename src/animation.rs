use std::fmt;

use crate::handles::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32, // seconds
    pub channel_count: usize,
}

impl AnimationClip {
    pub fn new<T: ToString>(name: T, duration: f32, channel_count: usize) -> Self {
        Self {
            name: name.to_string(),
            duration,
            channel_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipLibrary {
    clips: Vec<AnimationClip>,
}

impl ClipLibrary {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self { clips }
    }

    pub fn find_by_name(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.clips.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimationClip> {
        self.clips.iter()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Repeat,
    Once,
}

#[derive(Debug, Clone)]
pub struct Action {
    pub clip: String,
    pub duration: f32,
    pub time: f32,
    pub time_scale: f32,
    pub loop_mode: LoopMode,
    pub running: bool,
}

impl Action {
    fn new(clip: &AnimationClip) -> Self {
        Self {
            clip: clip.name.clone(),
            duration: clip.duration,
            time: 0.0,
            time_scale: 1.0,
            loop_mode: LoopMode::Repeat,
            running: false,
        }
    }

    pub fn play(&mut self) -> &mut Self {
        self.running = true;
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.running = false;
        self.time = 0.0;
        self
    }

    pub fn set_effective_time_scale(&mut self, factor: f32) -> &mut Self {
        self.time_scale = factor;
        self
    }

    pub fn set_loop(&mut self, mode: LoopMode) -> &mut Self {
        self.loop_mode = mode;
        self
    }

    fn advance(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }

        self.time += dt * self.time_scale;

        match self.loop_mode {
            LoopMode::Repeat => {
                if self.duration > 0.0 {
                    self.time = self.time.rem_euclid(self.duration);
                }
                false
            }
            LoopMode::Once => {
                let ended = if self.time_scale >= 0.0 {
                    self.time >= self.duration
                } else {
                    self.time <= 0.0
                };

                if ended {
                    self.time = self.time.clamp(0.0, self.duration);
                    self.running = false;
                }
                ended
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinishedEvent {
    pub clip: String,
}

pub type FinishedHandler = Box<dyn FnMut(&FinishedEvent, &mut AnimationPlayer)>;

/// Advances clip playback for a single root node.
///
/// A player is only valid for the root it was built against; binding a
/// different root means building a new player.
pub struct AnimationPlayer {
    root: NodeId,
    actions: Vec<Action>,
    handlers: Vec<FinishedHandler>,
    elapsed: f32,
}

impl fmt::Debug for AnimationPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationPlayer")
            .field("root", &self.root)
            .field("actions", &self.actions)
            .field("handlers", &self.handlers.len())
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

impl AnimationPlayer {
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            actions: Vec::new(),
            handlers: Vec::new(),
            elapsed: 0.0,
        }
    }

    pub fn playing_all(root: NodeId, library: &ClipLibrary) -> Self {
        let mut player = Self::new(root);
        for clip in library.iter() {
            player.play(clip);
        }
        player
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn clip_action(&mut self, clip: &AnimationClip) -> &mut Action {
        let index = match self.actions.iter().position(|a| a.clip == clip.name) {
            Some(index) => index,
            None => {
                self.actions.push(Action::new(clip));
                self.actions.len() - 1
            }
        };
        &mut self.actions[index]
    }

    pub fn play(&mut self, clip: &AnimationClip) -> &mut Action {
        self.clip_action(clip).play()
    }

    pub fn action(&self, clip: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.clip == clip)
    }

    pub fn stop_all(&mut self) {
        for action in &mut self.actions {
            action.stop();
        }
    }

    pub fn is_running(&self, clip: &str) -> bool {
        self.action(clip).is_some_and(|a| a.running)
    }

    pub fn active_clips(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter(|a| a.running)
            .map(|a| a.clip.as_str())
            .collect()
    }

    pub fn on_finished<F>(&mut self, handler: F)
    where
        F: FnMut(&FinishedEvent, &mut AnimationPlayer) + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Steps every running action by `dt` seconds, then runs the finished
    /// handlers for the one-shot clips that ended during this step.
    pub fn update(&mut self, dt: f32) -> Vec<FinishedEvent> {
        self.elapsed += dt;

        let events: Vec<FinishedEvent> = self
            .actions
            .iter_mut()
            .filter_map(|action| {
                action.advance(dt).then(|| FinishedEvent {
                    clip: action.clip.clone(),
                })
            })
            .collect();

        if !events.is_empty() && !self.handlers.is_empty() {
            let mut handlers = std::mem::take(&mut self.handlers);
            for event in &events {
                for handler in handlers.iter_mut() {
                    handler(event, self);
                }
            }
            // Handlers registered while dispatching go after the existing ones.
            handlers.append(&mut self.handlers);
            self.handlers = handlers;
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> ClipLibrary {
        ClipLibrary::new(vec![
            AnimationClip::new("idle", 2.0, 10),
            AnimationClip::new("run", 1.0, 10),
            AnimationClip::new("jump", 0.5, 10),
        ])
    }

    #[test]
    fn playing_all_starts_every_clip() {
        let player = AnimationPlayer::playing_all(NodeId(0), &library());
        assert_eq!(player.active_clips(), vec!["idle", "run", "jump"]);
    }

    #[test]
    fn stop_all_resets_time() {
        let mut player = AnimationPlayer::playing_all(NodeId(0), &library());
        player.update(0.25);
        player.stop_all();
        assert!(player.active_clips().is_empty());
        assert_eq!(player.action("idle").map(|a| a.time), Some(0.0));
    }

    #[test]
    fn repeat_wraps_around_duration() {
        let lib = library();
        let mut player = AnimationPlayer::new(NodeId(0));
        player.play(lib.find_by_name("run").unwrap());
        let events = player.update(1.5);
        assert!(events.is_empty());
        assert!((player.action("run").unwrap().time - 0.5).abs() < 1e-5);
        assert!(player.is_running("run"));
    }

    #[test]
    fn time_scale_speeds_up_playback() {
        let lib = library();
        let mut player = AnimationPlayer::new(NodeId(0));
        player
            .play(lib.find_by_name("idle").unwrap())
            .set_effective_time_scale(2.0);
        player.update(0.5);
        assert!((player.action("idle").unwrap().time - 1.0).abs() < 1e-5);
    }

    #[test]
    fn one_shot_fires_finished_and_handler_can_switch_clip() {
        let lib = library();
        let idle = lib.find_by_name("idle").unwrap().clone();

        let mut player = AnimationPlayer::new(NodeId(0));
        player
            .play(lib.find_by_name("jump").unwrap())
            .set_loop(LoopMode::Once);
        player.on_finished(move |_, player| {
            player.stop_all();
            player.play(&idle);
        });

        assert!(player.update(0.25).is_empty());
        let events = player.update(0.5);
        assert_eq!(
            events,
            vec![FinishedEvent {
                clip: "jump".to_string()
            }]
        );
        assert_eq!(player.active_clips(), vec!["idle"]);
        assert_eq!(player.handler_count(), 1);
    }
}
