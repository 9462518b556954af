pub mod twitch;
pub mod youtube;

pub use twitch::{TwitchConfig, TwitchDriver};
pub use youtube::{YoutubeConfig, YoutubeDriver};
