// Announcement message composition
//
// Pure string building over explicit values; no I/O, so the templates are
// unit-testable without filesystem or network access.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::models::{Speaker, TalkRecord};

/// Builds the two outbound message bodies for a talk.
#[derive(Debug, Clone)]
pub struct NotificationComposer {
    site_base_url: String,
    discussion_channel_id: String,
}

impl NotificationComposer {
    pub fn new(site_base_url: impl Into<String>, discussion_channel_id: impl Into<String>) -> Self {
        Self {
            site_base_url: site_base_url.into(),
            discussion_channel_id: discussion_channel_id.into(),
        }
    }

    /// The "starting right now" message.
    pub fn compose_immediate(&self, talk: &TalkRecord, speaker: &Speaker) -> String {
        format!(
            ":tada: Talk starting right now: **{title}** by *{speaker}*\n\
             \n\
             :tv: {video_url}\n\
             \n\
             See the talk information at {site}{permalink}\n\
             \n\
             Live discussions are happening in <#{channel}>.\n",
            title = talk.title,
            speaker = speaker.name,
            video_url = talk.video_url.as_deref().unwrap_or(""),
            site = self.site_base_url,
            permalink = talk.permalink.as_deref().unwrap_or(""),
            channel = self.discussion_channel_id,
        )
    }

    /// The five-minutes-to-go message, carrying a localized start time and
    /// a time-comparison link for attendees in other zones.
    pub fn compose_warning(
        &self,
        talk: &TalkRecord,
        speaker: &Speaker,
        trigger_time: DateTime<Tz>,
    ) -> String {
        format!(
            ":tada: Talk starting in 5 minutes: **{title}** by *{speaker}*\n\
             \n\
             :alarm_clock: Watch the talk at [{local}](https://time.is/compare/{compare}_in_{city})\n\
             \n\
             :tv: {video_url}\n\
             \n\
             See the talk information at {site}{permalink}\n\
             \n\
             Live discussions are happening in <#{channel}>.\n",
            title = talk.title,
            speaker = speaker.name,
            local = trigger_time.format("%H:%M %Z"),
            compare = trigger_time.format("%I%M%p_%d_%B_%Y"),
            city = zone_city(trigger_time.timezone()),
            video_url = talk.video_url.as_deref().unwrap_or(""),
            site = self.site_base_url,
            permalink = talk.permalink.as_deref().unwrap_or(""),
            channel = self.discussion_channel_id,
        )
    }
}

/// City segment of an IANA zone name ("America/Chicago" → "Chicago")
fn zone_city(tz: Tz) -> String {
    tz.name()
        .rsplit('/')
        .next()
        .unwrap_or("UTC")
        .replace('-', "_")
}
