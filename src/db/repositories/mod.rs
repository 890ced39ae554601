mod intentions;
mod redirects;
mod statistics;
