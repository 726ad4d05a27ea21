mod decoder;
mod interpreter;
