//! Plain-text rendering of stories and cache entries.

use storia_core::cache::CacheRecord;
use storia_core::models::{CachedStory, Story, StoryResponse};
use storia_core::utils::{format_date, format_location, single_line, truncate_string};
use storia_core::worker::Notification;

/// Width of the description column in listings
const DESCRIPTION_WIDTH: usize = 60;

fn story_line(story: &Story) -> String {
    format!(
        "{:<24} {:<18} {:<20} {}",
        story.id,
        truncate_string(&story.name, 18),
        format_date(&story.created_at),
        truncate_string(&single_line(&story.description), DESCRIPTION_WIDTH)
    )
}

fn print_notice(response: &StoryResponse) {
    if response.from_cache {
        if let Some(ref message) = response.message {
            println!("! {}", message);
        }
    }
}

pub fn print_listing(response: &StoryResponse) {
    print_notice(response);
    let stories = response.stories();
    if stories.is_empty() {
        println!("No stories yet.");
        return;
    }
    for story in stories {
        println!("{}", story_line(story));
    }
}

pub fn print_detail(response: &StoryResponse) {
    print_notice(response);
    let Some(ref story) = response.detail else {
        println!("Story not found.");
        return;
    };
    println!("{}", story.name);
    println!("  id:       {}", story.id);
    println!("  posted:   {}", format_date(&story.created_at));
    println!("  location: {}", format_location(story.location()));
    println!("  photo:    {}", story.photo_url);
    println!();
    println!("{}", story.description);
}

pub fn print_cached_stories(stories: &[CachedStory]) {
    if stories.is_empty() {
        println!("Nothing saved for offline reading.");
        return;
    }
    for cached in stories {
        println!("{}  [{}]", story_line(&cached.story), cached.cache_key);
    }
}

pub fn print_entries(records: &[CacheRecord]) {
    if records.is_empty() {
        println!("Cache is empty.");
        return;
    }
    for record in records {
        let expired = if record.is_expired() { " (expired)" } else { "" };
        println!(
            "{:<32} {:>3} stories  {}{}",
            record.id,
            record.story_count(),
            record.age_display(),
            expired
        );
    }
}

pub fn print_notification(notification: &Notification) {
    println!("[{}] {}", notification.icon, notification.title);
    println!("  {}", notification.body);
    if let Some(ref url) = notification.data.url {
        println!("  -> {}", url);
    }
}
