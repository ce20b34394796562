mod config;
mod help;
mod predict;
mod retrain;
