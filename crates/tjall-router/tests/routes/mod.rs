mod health;
mod users;
