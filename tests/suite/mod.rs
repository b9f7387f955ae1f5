mod game;
mod generation;
mod registry;
