mod input;
mod minimap;
mod view;
