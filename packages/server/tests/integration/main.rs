mod application;
mod postgres;
