pub mod animation;
pub mod baseline;
pub mod camera;
pub mod chat;
pub mod components;
pub mod config;
pub mod data;
pub mod editor;
pub mod exercises;
pub mod frame;
pub mod gui;
pub mod handles;
pub mod loader;
pub mod mesh;
pub mod motion;
pub mod opengl;
pub mod renderer;
pub mod scene;
pub mod script;
pub mod session;
pub mod shaders;
pub mod viewport;
