mod jobs;
mod quota;
mod refresher;
mod search;
mod spotify_client;
mod youtube_client;
