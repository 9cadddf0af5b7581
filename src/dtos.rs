pub mod propertydtos;
