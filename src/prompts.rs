pub const CAPTION_SYSTEM: &str = include_str!("../data/prompts/caption_system.txt");
pub const CAPTION_USER: &str = include_str!("../data/prompts/caption_user.txt");
