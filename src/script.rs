//! Animation scripts: the code learners type into the editor.
//!
//! A script is one statement per line. Words are split with shell quoting
//! rules, so `#` starts a comment and quotes group words. Every command
//! starts with the binding it talks to:
//!
//! - `scene add ground|cube|axes|grid|light ...`, `scene background RRGGBB`
//! - `lib clips`
//! - `model position|move|rotation|scale|pulse ...`
//! - `mixer stop-all|play|speed|then ...`
//! - `camera position|look-at|orbit ...`
//!
//! plus `log <text>`, `warn <text>` and the blocks `if bound <names>`,
//! `if clip <name>`, `else`, `end`.
//!
//! Scripts only see the bindings passed in [`Bindings`]; which of those are
//! usable is decided by the asset baseline of the running lesson.

use cgmath::{point3, vec3, EuclideanSpace, Point3, Vector3};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::{
    animation::{AnimationClip, AnimationPlayer, ClipLibrary, LoopMode},
    baseline::BindingName,
    camera::{OrbitControls, PerspectiveCamera},
    components::transform::Transform,
    handles::NodeId,
    mesh,
    motion::{self, Motion},
    scene::{Light, LightKind, NodeKind, Rgb, SceneGraph},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: `{name}` is not available in this lesson")]
    Unbound { line: usize, name: BindingName },

    #[error("line {line}: `{name}` is not loaded yet")]
    NotLoaded { line: usize, name: BindingName },

    #[error("line {line}: no animation clip named '{clip}'")]
    UnknownClip { line: usize, clip: String },
}

impl ExecError {
    pub fn line(&self) -> usize {
        match self {
            ExecError::Syntax { line, .. }
            | ExecError::Unbound { line, .. }
            | ExecError::NotLoaded { line, .. }
            | ExecError::UnknownClip { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl ScriptMessage {
    pub fn info<T: Into<String>>(text: T) -> Self {
        Self {
            level: MessageLevel::Info,
            text: text.into(),
        }
    }

    pub fn warn<T: Into<String>>(text: T) -> Self {
        Self {
            level: MessageLevel::Warn,
            text: text.into(),
        }
    }
}

pub struct Bindings<'a> {
    pub allowed: &'a [BindingName],
    pub scene: &'a mut SceneGraph,
    pub lib: &'a ClipLibrary,
    pub model: Option<NodeId>,
    pub mixer: Option<&'a mut AnimationPlayer>,
    pub camera: &'a mut PerspectiveCamera,
    pub controls: &'a mut Option<OrbitControls>,
    pub motions: &'a mut Vec<Motion>,
}

impl Bindings<'_> {
    pub fn reset_additions(&mut self) {
        self.scene.prune_to_baseline();
        *self.controls = None;
    }

    fn require(&self, name: BindingName, line: usize) -> Result<(), ExecError> {
        if self.allowed.contains(&name) {
            Ok(())
        } else {
            Err(ExecError::Unbound { line, name })
        }
    }

    fn is_present(&self, name: BindingName) -> bool {
        self.allowed.contains(&name)
            && match name {
                BindingName::Model => self.model.is_some_and(|id| self.scene.contains(id)),
                BindingName::Mixer => self.mixer.is_some(),
                BindingName::Scene | BindingName::Lib | BindingName::Camera => true,
            }
    }

    fn model_transform(&mut self, line: usize) -> Result<&mut Transform, ExecError> {
        self.require(BindingName::Model, line)?;
        let not_loaded = ExecError::NotLoaded {
            line,
            name: BindingName::Model,
        };
        let id = self.model.ok_or_else(|| not_loaded.clone())?;
        self.scene
            .get_mut(id)
            .map(|node| &mut node.transform)
            .ok_or(not_loaded)
    }

    fn mixer(&mut self, line: usize) -> Result<&mut AnimationPlayer, ExecError> {
        self.require(BindingName::Mixer, line)?;
        self.mixer.as_deref_mut().ok_or(ExecError::NotLoaded {
            line,
            name: BindingName::Mixer,
        })
    }
}

/// Runs learner code against a binding snapshot, once and synchronously.
pub trait Executor {
    fn run(
        &self,
        source: &str,
        bindings: &mut Bindings<'_>,
        output: &mut Vec<ScriptMessage>,
    ) -> Result<(), ExecError>;
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Bound(Vec<BindingName>),
    Clip(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Addition {
    Ground { size: f32, color: Rgb },
    Cube { size: f32, at: Vector3<f32>, color: Rgb },
    Axes { size: f32 },
    Grid { size: f32, divisions: u32 },
    Light { kind: LightKind, intensity: f32, at: Vector3<f32> },
}

#[derive(Debug, Clone, PartialEq)]
enum LookTarget {
    Model,
    Point(Point3<f32>),
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    SceneAdd(Addition),
    SceneBackground(Rgb),
    LibClips,
    ModelPosition(Vector3<f32>),
    ModelMove { delta: Vector3<f32>, frames: u32 },
    ModelRotation(Vector3<f32>), // degrees
    ModelScale(Vector3<f32>),
    ModelPulse { amplitude: f32, period: f32 },
    MixerStopAll,
    MixerPlay { clip: String, speed: Option<f32>, once: bool },
    MixerSpeed { clip: String, factor: f32 },
    MixerThen { clip: String },
    CameraPosition(Point3<f32>),
    CameraLookAt(LookTarget),
    CameraOrbit { damping: Option<f32>, auto_rotate: Option<f32> },
    Log(String),
    Warn(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    If {
        line: usize,
        condition: Condition,
        then: Vec<Statement>,
        otherwise: Vec<Statement>,
    },
    Op {
        line: usize,
        op: Op,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    statements: Vec<Statement>,
}

impl Script {
    pub fn statement_count(&self) -> usize {
        fn count(statements: &[Statement]) -> usize {
            statements
                .iter()
                .map(|s| match s {
                    Statement::If {
                        then, otherwise, ..
                    } => 1 + count(then) + count(otherwise),
                    Statement::Op { .. } => 1,
                })
                .sum()
        }
        count(&self.statements)
    }
}

enum Line {
    If(Condition),
    Else,
    End,
    Op(Op),
}

struct OpenBlock {
    line: usize,
    condition: Condition,
    then: Vec<Statement>,
    otherwise: Vec<Statement>,
    in_else: bool,
}

impl OpenBlock {
    fn current(&mut self) -> &mut Vec<Statement> {
        if self.in_else {
            &mut self.otherwise
        } else {
            &mut self.then
        }
    }
}

pub struct ScriptExecutor {
    commands: Command,
}

impl Default for ScriptExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptExecutor {
    pub fn new() -> Self {
        Self {
            commands: command_tree(),
        }
    }

    pub fn compile(&self, source: &str) -> Result<Script, ExecError> {
        let mut root: Vec<Statement> = Vec::new();
        let mut open: Vec<OpenBlock> = Vec::new();

        for (index, text) in source.lines().enumerate() {
            let line = index + 1;
            let words = shell_words::split(text).map_err(|e| ExecError::Syntax {
                line,
                message: e.to_string(),
            })?;

            if words.is_empty() {
                continue;
            }

            match self.parse_line(&words, line)? {
                Line::If(condition) => open.push(OpenBlock {
                    line,
                    condition,
                    then: Vec::new(),
                    otherwise: Vec::new(),
                    in_else: false,
                }),
                Line::Else => match open.last_mut() {
                    Some(block) if !block.in_else => block.in_else = true,
                    Some(_) => {
                        return Err(ExecError::Syntax {
                            line,
                            message: "second `else` in the same `if`".to_string(),
                        })
                    }
                    None => {
                        return Err(ExecError::Syntax {
                            line,
                            message: "`else` without `if`".to_string(),
                        })
                    }
                },
                Line::End => {
                    let block = open.pop().ok_or_else(|| ExecError::Syntax {
                        line,
                        message: "`end` without `if`".to_string(),
                    })?;
                    let statement = Statement::If {
                        line: block.line,
                        condition: block.condition,
                        then: block.then,
                        otherwise: block.otherwise,
                    };
                    match open.last_mut() {
                        Some(parent) => parent.current().push(statement),
                        None => root.push(statement),
                    }
                }
                Line::Op(op) => {
                    let statement = Statement::Op { line, op };
                    match open.last_mut() {
                        Some(parent) => parent.current().push(statement),
                        None => root.push(statement),
                    }
                }
            }
        }

        if let Some(block) = open.last() {
            return Err(ExecError::Syntax {
                line: block.line,
                message: "`if` is missing its `end`".to_string(),
            });
        }

        Ok(Script { statements: root })
    }

    fn parse_line(&self, words: &[String], line: usize) -> Result<Line, ExecError> {
        let syntax = |message: String| ExecError::Syntax { line, message };

        match words[0].as_str() {
            "if" => parse_condition(&words[1..]).map(Line::If).map_err(syntax),
            "else" if words.len() == 1 => Ok(Line::Else),
            "end" if words.len() == 1 => Ok(Line::End),
            "log" => Ok(Line::Op(Op::Log(words[1..].join(" ")))),
            "warn" => Ok(Line::Op(Op::Warn(words[1..].join(" ")))),
            _ => {
                let matches = self
                    .commands
                    .clone()
                    .try_get_matches_from(words)
                    .map_err(|e| syntax(clap_message(&e)))?;
                op_from_matches(&matches).map(Line::Op).map_err(syntax)
            }
        }
    }

    fn exec_block(
        &self,
        statements: &[Statement],
        bindings: &mut Bindings<'_>,
        output: &mut Vec<ScriptMessage>,
    ) -> Result<(), ExecError> {
        for statement in statements {
            match statement {
                Statement::If {
                    line,
                    condition,
                    then,
                    otherwise,
                } => {
                    let branch = if eval_condition(condition, bindings, *line)? {
                        then
                    } else {
                        otherwise
                    };
                    self.exec_block(branch, bindings, output)?;
                }
                Statement::Op { line, op } => exec_op(op, *line, bindings, output)?,
            }
        }
        Ok(())
    }
}

impl Executor for ScriptExecutor {
    fn run(
        &self,
        source: &str,
        bindings: &mut Bindings<'_>,
        output: &mut Vec<ScriptMessage>,
    ) -> Result<(), ExecError> {
        bindings.reset_additions();
        let script = self.compile(source)?;
        self.exec_block(&script.statements, bindings, output)
    }
}

fn eval_condition(
    condition: &Condition,
    bindings: &Bindings<'_>,
    line: usize,
) -> Result<bool, ExecError> {
    match condition {
        Condition::Bound(names) => Ok(names.iter().all(|name| bindings.is_present(*name))),
        Condition::Clip(name) => {
            bindings.require(BindingName::Lib, line)?;
            Ok(bindings.lib.find_by_name(name).is_some())
        }
    }
}

fn exec_op(
    op: &Op,
    line: usize,
    b: &mut Bindings<'_>,
    output: &mut Vec<ScriptMessage>,
) -> Result<(), ExecError> {
    match op {
        Op::Log(text) => output.push(ScriptMessage::info(text.clone())),
        Op::Warn(text) => output.push(ScriptMessage::warn(text.clone())),

        Op::SceneAdd(addition) => {
            b.require(BindingName::Scene, line)?;
            add_to_scene(b.scene, addition);
        }
        Op::SceneBackground(color) => {
            b.require(BindingName::Scene, line)?;
            b.scene.background = *color;
        }

        Op::LibClips => {
            b.require(BindingName::Lib, line)?;
            let names = b.lib.names();
            if names.is_empty() {
                output.push(ScriptMessage::info("no clips loaded"));
            } else {
                output.push(ScriptMessage::info(format!("clips: {}", names.join(", "))));
            }
        }

        Op::ModelPosition(position) => b.model_transform(line)?.translation = *position,
        Op::ModelRotation(degrees) => {
            b.model_transform(line)?.rotation = vec3(
                degrees.x.to_radians(),
                degrees.y.to_radians(),
                degrees.z.to_radians(),
            )
        }
        Op::ModelScale(scale) => {
            b.model_transform(line)?.scale = *scale;
            if let Some(node) = b.model {
                motion::take_pulse(b.motions, node);
            }
        }
        Op::ModelMove { delta, frames } => {
            let transform = b.model_transform(line)?;
            if *frames == 0 {
                transform.translation += *delta;
            } else if let Some(node) = b.model {
                b.motions.push(Motion::Translate {
                    node,
                    step: *delta,
                    remaining_frames: *frames,
                });
            }
        }
        Op::ModelPulse { amplitude, period } => {
            let current = b.model_transform(line)?.scale;
            if let Some(node) = b.model {
                // A running pulse leaves the model mid-swing; restart from its resting scale.
                let base = motion::take_pulse(b.motions, node).unwrap_or(current);
                b.motions.push(Motion::Pulse {
                    node,
                    base,
                    amplitude: *amplitude,
                    period: *period,
                    elapsed: 0.0,
                });
            }
        }

        Op::MixerStopAll => b.mixer(line)?.stop_all(),
        Op::MixerPlay { clip, speed, once } => {
            let clip = find_clip(b.lib, clip, line)?.clone();
            let action = b.mixer(line)?.play(&clip);
            if let Some(speed) = speed {
                action.set_effective_time_scale(*speed);
            }
            if *once {
                action.set_loop(LoopMode::Once);
            }
        }
        Op::MixerSpeed { clip, factor } => {
            let clip = find_clip(b.lib, clip, line)?.clone();
            b.mixer(line)?
                .clip_action(&clip)
                .set_effective_time_scale(*factor);
        }
        Op::MixerThen { clip } => {
            let next = find_clip(b.lib, clip, line)?.clone();
            b.mixer(line)?.on_finished(move |_, player| {
                player.stop_all();
                player.play(&next);
            });
        }

        Op::CameraPosition(position) => {
            b.require(BindingName::Camera, line)?;
            b.camera.set_position(*position);
        }
        Op::CameraLookAt(target) => {
            b.require(BindingName::Camera, line)?;
            let point = match target {
                LookTarget::Point(point) => *point,
                LookTarget::Model => Point3::from_vec(b.model_transform(line)?.translation),
            };
            b.camera.look_at(point);
        }
        Op::CameraOrbit {
            damping,
            auto_rotate,
        } => {
            b.require(BindingName::Camera, line)?;
            let mut controls = OrbitControls::new(b.camera.target);
            if let Some(damping) = damping {
                controls = controls.with_damping(*damping);
            }
            if let Some(speed) = auto_rotate {
                controls = controls.with_auto_rotate(*speed);
            }
            *b.controls = Some(controls);
        }
    }

    Ok(())
}

fn find_clip<'l>(
    lib: &'l ClipLibrary,
    name: &str,
    line: usize,
) -> Result<&'l AnimationClip, ExecError> {
    lib.find_by_name(name).ok_or_else(|| ExecError::UnknownClip {
        line,
        clip: name.to_string(),
    })
}

fn add_to_scene(scene: &mut SceneGraph, addition: &Addition) {
    match addition {
        Addition::Ground { size, color } => {
            scene.add(
                "Ground",
                NodeKind::Ground {
                    size: *size,
                    color: *color,
                },
                Transform::default(),
            );
        }
        Addition::Cube { size, at, color } => {
            scene.add(
                "Cube",
                NodeKind::Cube {
                    size: *size,
                    color: *color,
                },
                Transform::from_translation(*at),
            );
        }
        Addition::Axes { size } => {
            scene.add("Axes", NodeKind::Axes { size: *size }, Transform::default());
        }
        Addition::Grid { size, divisions } => {
            scene.add(
                "Grid",
                NodeKind::Grid {
                    size: *size,
                    divisions: *divisions,
                },
                Transform::default(),
            );
        }
        Addition::Light {
            kind,
            intensity,
            at,
        } => {
            scene.add(
                "Light",
                NodeKind::Light(Light {
                    kind: *kind,
                    color: [1.0, 1.0, 1.0],
                    intensity: *intensity,
                }),
                Transform::from_translation(*at),
            );
        }
    }
}

fn parse_condition(words: &[String]) -> Result<Condition, String> {
    match words.first().map(String::as_str) {
        Some("bound") if words.len() > 1 => words[1..]
            .iter()
            .map(|w| BindingName::parse(w).ok_or_else(|| format!("unknown binding '{}'", w)))
            .collect::<Result<Vec<_>, _>>()
            .map(Condition::Bound),
        Some("clip") if words.len() == 2 => Ok(Condition::Clip(words[1].clone())),
        _ => Err("expected `if bound <names...>` or `if clip <name>`".to_string()),
    }
}

pub fn parse_color(text: &str) -> Result<Rgb, String> {
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix('#'))
        .unwrap_or(text);

    if hex.len() != 6 {
        return Err(format!("color '{}' must be six hex digits", text));
    }

    let value =
        u32::from_str_radix(hex, 16).map_err(|_| format!("color '{}' is not hex", text))?;

    Ok([
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    ])
}

fn clap_message(error: &clap::Error) -> String {
    let rendered = error.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

fn number(name: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .allow_negative_numbers(true)
        .value_parser(value_parser!(f32))
}

fn float_option(name: &'static str, default: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .allow_negative_numbers(true)
        .value_parser(value_parser!(f32))
        .default_value(default)
}

fn color_option(default: &'static str) -> Arg {
    Arg::new("color").long("color").default_value(default)
}

fn at_option() -> Arg {
    Arg::new("at")
        .long("at")
        .num_args(3)
        .allow_negative_numbers(true)
        .value_parser(value_parser!(f32))
}

fn with_xyz(command: Command) -> Command {
    command.arg(number("x")).arg(number("y")).arg(number("z"))
}

fn command_tree() -> Command {
    Command::new("script")
        .no_binary_name(true)
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .subcommand(
            Command::new("scene")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .subcommand_required(true)
                        .subcommand(
                            Command::new("ground")
                                .arg(float_option("size", "20"))
                                .arg(color_option("999999")),
                        )
                        .subcommand(
                            Command::new("cube")
                                .arg(float_option("size", "1"))
                                .arg(at_option())
                                .arg(color_option("cc4444")),
                        )
                        .subcommand(Command::new("axes").arg(float_option("size", "2")))
                        .subcommand(
                            Command::new("grid").arg(float_option("size", "10")).arg(
                                Arg::new("divisions")
                                    .long("divisions")
                                    .value_parser(
                                        value_parser!(u32)
                                            .range(1..=i64::from(mesh::MAX_GRID_DIVISIONS)),
                                    )
                                    .default_value("10"),
                            ),
                        )
                        .subcommand(
                            Command::new("light")
                                .arg(
                                    Arg::new("kind")
                                        .required(true)
                                        .value_parser(["ambient", "directional", "point"]),
                                )
                                .arg(float_option("intensity", "1"))
                                .arg(at_option()),
                        ),
                )
                .subcommand(Command::new("background").arg(Arg::new("color").required(true))),
        )
        .subcommand(
            Command::new("lib")
                .subcommand_required(true)
                .subcommand(Command::new("clips")),
        )
        .subcommand(
            Command::new("model")
                .subcommand_required(true)
                .subcommand(with_xyz(Command::new("position")))
                .subcommand(
                    with_xyz(Command::new("move")).arg(
                        Arg::new("frames")
                            .long("frames")
                            .value_parser(value_parser!(u32))
                            .default_value("0"),
                    ),
                )
                .subcommand(with_xyz(Command::new("rotation")))
                .subcommand(
                    Command::new("scale").arg(
                        Arg::new("values")
                            .required(true)
                            .num_args(1..=3)
                            .allow_negative_numbers(true)
                            .value_parser(value_parser!(f32)),
                    ),
                )
                .subcommand(
                    Command::new("pulse")
                        .arg(float_option("amplitude", "0.2"))
                        .arg(float_option("period", "1")),
                ),
        )
        .subcommand(
            Command::new("mixer")
                .subcommand_required(true)
                .subcommand(Command::new("stop-all"))
                .subcommand(
                    Command::new("play")
                        .arg(Arg::new("clip").required(true))
                        .arg(
                            Arg::new("speed")
                                .long("speed")
                                .allow_negative_numbers(true)
                                .value_parser(value_parser!(f32)),
                        )
                        .arg(Arg::new("once").long("once").action(ArgAction::SetTrue)),
                )
                .subcommand(
                    Command::new("speed")
                        .arg(Arg::new("clip").required(true))
                        .arg(number("factor")),
                )
                .subcommand(Command::new("then").arg(Arg::new("clip").required(true))),
        )
        .subcommand(
            Command::new("camera")
                .subcommand_required(true)
                .subcommand(with_xyz(Command::new("position")))
                .subcommand(
                    Command::new("look-at").arg(
                        Arg::new("target")
                            .required(true)
                            .num_args(1..=3)
                            .allow_negative_numbers(true),
                    ),
                )
                .subcommand(
                    Command::new("orbit")
                        .arg(
                            Arg::new("damping")
                                .long("damping")
                                .value_parser(value_parser!(f32)),
                        )
                        .arg(
                            Arg::new("auto-rotate")
                                .long("auto-rotate")
                                .allow_negative_numbers(true)
                                .value_parser(value_parser!(f32)),
                        ),
                ),
        )
}

fn f32_arg(matches: &ArgMatches, name: &str) -> f32 {
    matches.get_one::<f32>(name).copied().unwrap_or_default()
}

fn string_arg(matches: &ArgMatches, name: &str) -> String {
    matches.get_one::<String>(name).cloned().unwrap_or_default()
}

fn xyz(matches: &ArgMatches) -> Vector3<f32> {
    vec3(f32_arg(matches, "x"), f32_arg(matches, "y"), f32_arg(matches, "z"))
}

fn at(matches: &ArgMatches) -> Vector3<f32> {
    match matches.get_many::<f32>("at") {
        Some(values) => {
            let v: Vec<f32> = values.copied().collect();
            vec3(v[0], v[1], v[2])
        }
        None => vec3(0.0, 0.0, 0.0),
    }
}

fn color(matches: &ArgMatches) -> Result<Rgb, String> {
    parse_color(&string_arg(matches, "color"))
}

fn op_from_matches(matches: &ArgMatches) -> Result<Op, String> {
    let unknown = || "unknown command".to_string();

    match matches.subcommand().ok_or_else(unknown)? {
        ("scene", scene) => match scene.subcommand().ok_or_else(unknown)? {
            ("add", add) => {
                let addition = match add.subcommand().ok_or_else(unknown)? {
                    ("ground", m) => Addition::Ground {
                        size: f32_arg(m, "size"),
                        color: color(m)?,
                    },
                    ("cube", m) => Addition::Cube {
                        size: f32_arg(m, "size"),
                        at: at(m),
                        color: color(m)?,
                    },
                    ("axes", m) => Addition::Axes {
                        size: f32_arg(m, "size"),
                    },
                    ("grid", m) => Addition::Grid {
                        size: f32_arg(m, "size"),
                        divisions: m.get_one::<u32>("divisions").copied().unwrap_or(10),
                    },
                    ("light", m) => Addition::Light {
                        kind: match string_arg(m, "kind").as_str() {
                            "ambient" => LightKind::Ambient,
                            "directional" => LightKind::Directional,
                            _ => LightKind::Point,
                        },
                        intensity: f32_arg(m, "intensity"),
                        at: at(m),
                    },
                    _ => return Err(unknown()),
                };
                Ok(Op::SceneAdd(addition))
            }
            ("background", m) => Ok(Op::SceneBackground(color(m)?)),
            _ => Err(unknown()),
        },

        ("lib", lib) => match lib.subcommand().ok_or_else(unknown)? {
            ("clips", _) => Ok(Op::LibClips),
            _ => Err(unknown()),
        },

        ("model", model) => match model.subcommand().ok_or_else(unknown)? {
            ("position", m) => Ok(Op::ModelPosition(xyz(m))),
            ("move", m) => Ok(Op::ModelMove {
                delta: xyz(m),
                frames: m.get_one::<u32>("frames").copied().unwrap_or(0),
            }),
            ("rotation", m) => Ok(Op::ModelRotation(xyz(m))),
            ("scale", m) => {
                let values: Vec<f32> = m
                    .get_many::<f32>("values")
                    .map(|v| v.copied().collect())
                    .unwrap_or_default();
                match values.as_slice() {
                    [s] => Ok(Op::ModelScale(vec3(*s, *s, *s))),
                    [x, y, z] => Ok(Op::ModelScale(vec3(*x, *y, *z))),
                    _ => Err("`model scale` takes one value or three".to_string()),
                }
            }
            ("pulse", m) => Ok(Op::ModelPulse {
                amplitude: f32_arg(m, "amplitude"),
                period: f32_arg(m, "period"),
            }),
            _ => Err(unknown()),
        },

        ("mixer", mixer) => match mixer.subcommand().ok_or_else(unknown)? {
            ("stop-all", _) => Ok(Op::MixerStopAll),
            ("play", m) => Ok(Op::MixerPlay {
                clip: string_arg(m, "clip"),
                speed: m.get_one::<f32>("speed").copied(),
                once: m.get_flag("once"),
            }),
            ("speed", m) => Ok(Op::MixerSpeed {
                clip: string_arg(m, "clip"),
                factor: f32_arg(m, "factor"),
            }),
            ("then", m) => Ok(Op::MixerThen {
                clip: string_arg(m, "clip"),
            }),
            _ => Err(unknown()),
        },

        ("camera", camera) => match camera.subcommand().ok_or_else(unknown)? {
            ("position", m) => Ok(Op::CameraPosition(Point3::from_vec(xyz(m)))),
            ("look-at", m) => {
                let words: Vec<&String> = m
                    .get_many::<String>("target")
                    .map(|v| v.collect())
                    .unwrap_or_default();
                match words.as_slice() {
                    [w] if w.as_str() == "model" => Ok(Op::CameraLookAt(LookTarget::Model)),
                    [x, y, z] => {
                        let parse = |w: &String| {
                            w.parse::<f32>()
                                .map_err(|_| format!("'{}' is not a number", w))
                        };
                        Ok(Op::CameraLookAt(LookTarget::Point(point3(
                            parse(x)?,
                            parse(y)?,
                            parse(z)?,
                        ))))
                    }
                    _ => Err("`camera look-at` takes `model` or X Y Z".to_string()),
                }
            }
            ("orbit", m) => Ok(Op::CameraOrbit {
                damping: m.get_one::<f32>("damping").copied(),
                auto_rotate: m.get_one::<f32>("auto-rotate").copied(),
            }),
            _ => Err(unknown()),
        },

        _ => Err(unknown()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        scene: SceneGraph,
        lib: ClipLibrary,
        model: Option<NodeId>,
        mixer: Option<AnimationPlayer>,
        camera: PerspectiveCamera,
        controls: Option<OrbitControls>,
        motions: Vec<Motion>,
        allowed: Vec<BindingName>,
    }

    impl Fixture {
        fn loaded() -> Self {
            let mut scene = SceneGraph::with_default_lighting("Test");
            let model = scene.add("Model", NodeKind::Model, Transform::default());
            scene.mark_permanent(model);
            let lib = ClipLibrary::new(vec![
                AnimationClip::new("idle", 2.0, 4),
                AnimationClip::new("run", 1.0, 4),
                AnimationClip::new("jump", 0.5, 4),
            ]);
            let mixer = AnimationPlayer::playing_all(model, &lib);

            Self {
                scene,
                lib,
                model: Some(model),
                mixer: Some(mixer),
                camera: PerspectiveCamera::new(
                    "Camera".to_string(),
                    point3(0.0, 5.0, 15.0),
                    75.0,
                    800,
                    600,
                    0.1,
                    1000.0,
                ),
                controls: None,
                motions: Vec::new(),
                allowed: BindingName::ALL.to_vec(),
            }
        }

        fn unloaded() -> Self {
            let mut fixture = Self::loaded();
            fixture.scene = SceneGraph::with_default_lighting("Test");
            fixture.model = None;
            fixture.mixer = None;
            fixture.lib = ClipLibrary::default();
            fixture
        }

        fn run(&mut self, source: &str) -> (Result<(), ExecError>, Vec<ScriptMessage>) {
            let mut output = Vec::new();
            let mut bindings = Bindings {
                allowed: &self.allowed,
                scene: &mut self.scene,
                lib: &self.lib,
                model: self.model,
                mixer: self.mixer.as_mut(),
                camera: &mut self.camera,
                controls: &mut self.controls,
                motions: &mut self.motions,
            };
            let result = ScriptExecutor::new().run(source, &mut bindings, &mut output);
            (result, output)
        }

        fn model_transform(&self) -> Transform {
            self.scene.get(self.model.unwrap()).unwrap().transform
        }
    }

    #[test]
    fn comments_and_blank_lines_compile_to_nothing() {
        let script = ScriptExecutor::new()
            .compile("# hello\n\n   \n# mixer play run")
            .unwrap();
        assert_eq!(script.statement_count(), 0);
    }

    #[test]
    fn play_run_stops_the_rest() {
        let mut f = Fixture::loaded();
        let (result, _) = f.run("mixer stop-all\nmixer play run");
        result.unwrap();
        assert_eq!(f.mixer.as_ref().unwrap().active_clips(), vec!["run"]);
    }

    #[test]
    fn clip_check_takes_else_branch_and_warns() {
        let mut f = Fixture::loaded();
        let source = "\
if clip fall
    mixer play fall
else
    warn \"'fall' animation clip not found.\"
    model rotation 90 0 0
    model position 0 -0.5 0
end";
        let (result, output) = f.run(source);
        result.unwrap();
        assert_eq!(output, vec![ScriptMessage::warn("'fall' animation clip not found.")]);

        let transform = f.model_transform();
        assert!((transform.rotation.x - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert_eq!(transform.translation.y, -0.5);
    }

    #[test]
    fn unknown_command_is_a_syntax_error_with_line() {
        let mut f = Fixture::loaded();
        let (result, _) = f.run("mixer stop-all\nmixer dance");
        assert!(matches!(result, Err(ExecError::Syntax { line: 2, .. })));
        // Nothing ran: the compile step failed first.
        assert_eq!(f.mixer.as_ref().unwrap().active_clips().len(), 3);
    }

    #[test]
    fn oversized_grid_is_a_syntax_error() {
        let mut f = Fixture::loaded();
        let (result, _) = f.run("log start\nscene add grid --divisions 4000000000");
        assert!(matches!(result, Err(ExecError::Syntax { line: 2, .. })));
        assert!(matches!(
            f.run("scene add grid --divisions 0").0,
            Err(ExecError::Syntax { line: 1, .. })
        ));

        f.run("scene add grid --divisions 1000").0.unwrap();
        assert_eq!(
            f.scene.find_by_name("Grid").map(|node| node.kind.clone()),
            Some(NodeKind::Grid {
                size: 10.0,
                divisions: 1000
            })
        );
    }

    #[test]
    fn unbalanced_blocks_are_rejected() {
        let executor = ScriptExecutor::new();
        assert!(matches!(
            executor.compile("if clip run\nmixer play run"),
            Err(ExecError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            executor.compile("end"),
            Err(ExecError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            executor.compile("if clip run\nelse\nelse\nend"),
            Err(ExecError::Syntax { line: 3, .. })
        ));
    }

    #[test]
    fn unterminated_quote_is_a_syntax_error() {
        let executor = ScriptExecutor::new();
        assert!(matches!(
            executor.compile("warn \"oops"),
            Err(ExecError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn playing_a_missing_clip_is_a_runtime_error() {
        let mut f = Fixture::loaded();
        let (result, _) = f.run("mixer stop-all\nmixer play fly");
        assert_eq!(
            result,
            Err(ExecError::UnknownClip {
                line: 2,
                clip: "fly".to_string()
            })
        );
        // The first line already ran.
        assert!(f.mixer.as_ref().unwrap().active_clips().is_empty());
    }

    #[test]
    fn bindings_outside_the_lesson_are_unbound() {
        let mut f = Fixture::loaded();
        f.allowed = vec![BindingName::Scene, BindingName::Lib];
        let (result, _) = f.run("camera position 0 1 2");
        assert_eq!(
            result,
            Err(ExecError::Unbound {
                line: 1,
                name: BindingName::Camera
            })
        );
    }

    #[test]
    fn model_before_load_is_not_loaded() {
        let mut f = Fixture::unloaded();
        let (result, _) = f.run("model position 0 1 0");
        assert_eq!(
            result,
            Err(ExecError::NotLoaded {
                line: 1,
                name: BindingName::Model
            })
        );

        let (result, _) = f.run("if bound mixer model\n  mixer stop-all\nend");
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn each_run_starts_from_a_pruned_scene() {
        let mut f = Fixture::loaded();
        f.run("scene add ground --size 30 --color 88aa66\ncamera orbit --damping 0.1")
            .0
            .unwrap();
        assert!(f.scene.find_by_name("Ground").is_some());
        assert!(f.controls.is_some());

        f.run("log again").0.unwrap();
        assert!(f.scene.find_by_name("Ground").is_none());
        assert!(f.controls.is_none());
    }

    #[test]
    fn move_with_frames_schedules_a_motion() {
        let mut f = Fixture::loaded();
        f.run("model move 0 0 0.05 --frames 200").0.unwrap();
        assert_eq!(f.motions.len(), 1);
        assert_eq!(f.model_transform().translation.z, 0.0);

        f.run("model move 1 0 0").0.unwrap();
        assert_eq!(f.model_transform().translation.x, 1.0);
    }

    #[test]
    fn pulse_again_replaces_the_running_pulse() {
        let mut f = Fixture::loaded();
        f.run("model scale 0.5\nmodel pulse --amplitude 0.2 --period 1").0.unwrap();
        motion::advance_all(&mut f.motions, &mut f.scene, 0.25);
        assert!((f.model_transform().scale.x - 0.6).abs() < 1e-4);

        f.run("model pulse --amplitude 0.2 --period 1").0.unwrap();
        assert_eq!(f.motions.len(), 1);
        assert!(matches!(
            f.motions[0],
            Motion::Pulse { base, .. } if base == vec3(0.5, 0.5, 0.5)
        ));

        f.run("model scale 2").0.unwrap();
        assert!(f.motions.is_empty());
        assert_eq!(f.model_transform().scale, vec3(2.0, 2.0, 2.0));
    }

    #[test]
    fn then_registers_finished_handler() {
        let mut f = Fixture::loaded();
        f.run("mixer stop-all\nmixer play jump --once\nmixer then idle")
            .0
            .unwrap();

        let mixer = f.mixer.as_mut().unwrap();
        assert_eq!(mixer.active_clips(), vec!["jump"]);
        mixer.update(1.0);
        assert_eq!(mixer.active_clips(), vec!["idle"]);
    }

    #[test]
    fn speed_and_negative_numbers_parse() {
        let mut f = Fixture::loaded();
        f.run("mixer play run --speed 2\ncamera look-at 0 -1 0\nmodel scale 0.5")
            .0
            .unwrap();
        assert_eq!(f.mixer.as_ref().unwrap().action("run").unwrap().time_scale, 2.0);
        assert_eq!(f.camera.target, point3(0.0, -1.0, 0.0));
        assert_eq!(f.model_transform().scale, vec3(0.5, 0.5, 0.5));
    }

    #[test]
    fn lib_clips_lists_names() {
        let mut f = Fixture::loaded();
        let (result, output) = f.run("lib clips");
        result.unwrap();
        assert_eq!(output, vec![ScriptMessage::info("clips: idle, run, jump")]);
    }

    #[test]
    fn colors_parse_with_or_without_prefix() {
        assert_eq!(parse_color("ff0000"), Ok([1.0, 0.0, 0.0]));
        assert_eq!(parse_color("0x00ff00"), Ok([0.0, 1.0, 0.0]));
        assert!(parse_color("red").is_err());
    }
}
