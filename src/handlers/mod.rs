pub mod articulos;
pub mod auth;
pub mod usuarios;
