mod operator;
mod routes;
