use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use serenity::{
    async_trait,
    client::{Context, EventHandler},
    model::{
        channel::Message,
        gateway::{GatewayIntents, Ready},
        id::GuildId,
        voice::VoiceState,
    },
    Client,
};
use songbird::{
    driver::DecodeMode,
    model::payload::{ClientDisconnect, Speaking},
    Call, CoreEvent, Event, EventContext, EventHandler as VoiceEventHandler, SerenityInit,
    Songbird,
};
use tracing::{debug, info, warn};

use super::commands::{help_text, Command};
use super::system::SessionRegistry;
use crate::{audio::AudioSession, state::Config};

/// The bot handling logic
pub struct Bot {
    client: Client,
}

impl Bot {
    pub async fn new(config: Config, registry: Arc<SessionRegistry>) -> Result<Self, serenity::Error> {
        let handler = Handler {
            registry,
            prefix: config.command_prefix.clone(),
        };

        // Without decode the driver hands us opus, not the PCM we ingest
        let songbird_config = songbird::Config::default().decode_mode(DecodeMode::Decode);

        let client = Client::builder(&config.bot_token, intents())
            .register_songbird_from_config(songbird_config)
            .event_handler(handler)
            .await?;

        Ok(Self { client })
    }

    pub async fn start(&mut self) -> Result<(), serenity::Error> {
        self.client.start().await
    }
}

struct Handler {
    registry: Arc<SessionRegistry>,
    prefix: String,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _context: Context, ready: Ready) {
        info!(user = %ready.user.name, "connected to discord");
    }

    async fn message(&self, context: Context, message: Message) {
        if message.author.bot {
            return;
        }

        let Some(guild_id) = message.guild_id else {
            return;
        };

        let Some(command) = Command::parse(&message.content, &self.prefix) else {
            return;
        };

        let reply = match command {
            Command::Join => self.join(&context, &message, guild_id).await,
            Command::Leave => self.leave(&context, guild_id).await,
            Command::Status => Ok(self.status(guild_id)),
            Command::Usage(usage) => Err(format!("usage: `{}{usage}`", self.prefix)),
            mode_change => self.apply_mode(guild_id, mode_change),
        };

        let text = reply.unwrap_or_else(|err| err);

        if let Err(err) = message.channel_id.say(&context.http, text).await {
            warn!(%err, "could not send reply");
        }
    }

    /// Leave automatically once everyone else has left the channel
    async fn voice_state_update(&self, context: Context, _: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };

        if self.registry.session(guild_id).is_none() {
            return;
        }

        let Some(channel_occupants) = self.occupants_of_own_channel(&context, guild_id) else {
            return;
        };

        if channel_occupants <= 1 {
            info!(guild = guild_id.0, "everyone left, leaving voice channel");

            self.registry.teardown(guild_id);

            if let Err(err) = manager(&context).await.remove(guild_id).await {
                warn!(%err, "could not leave voice channel");
            }
        }
    }
}

impl Handler {
    async fn join(
        &self,
        context: &Context,
        message: &Message,
        guild_id: GuildId,
    ) -> Result<String, String> {
        let channel_id = context
            .cache
            .guild(guild_id)
            .and_then(|guild| {
                guild
                    .voice_states
                    .get(&message.author.id)
                    .and_then(|state| state.channel_id)
            })
            .ok_or_else(|| "join a voice channel first".to_string())?;

        let (call, result) = manager(context).await.join(guild_id, channel_id).await;
        result.map_err(|err| format!("could not join the channel: {err}"))?;

        let session = self.registry.create(guild_id);
        let receiver = VoiceReceiver::new(session.clone(), Arc::downgrade(&call));

        {
            let mut call = call.lock().await;

            // A rejoin reuses the call; drop the previous session's
            // receivers so they stop firing on every packet
            call.remove_all_global_events();

            call.add_global_event(CoreEvent::VoicePacket.into(), receiver.clone());
            call.add_global_event(CoreEvent::SpeakingStateUpdate.into(), receiver.clone());
            call.add_global_event(CoreEvent::ClientDisconnect.into(), receiver);
        }

        Ok(format!(
            "joined! current mode: {}\nyour voice is transformed and played back into the channel",
            session.control().mode().describe()
        ))
    }

    async fn leave(&self, context: &Context, guild_id: GuildId) -> Result<String, String> {
        self.registry
            .teardown(guild_id)
            .ok_or_else(|| "not in a voice channel".to_string())?;

        manager(context)
            .await
            .remove(guild_id)
            .await
            .map_err(|err| format!("could not leave: {err}"))?;

        Ok("left the voice channel".to_string())
    }

    fn apply_mode(&self, guild_id: GuildId, command: Command) -> Result<String, String> {
        let session = self.registry.session(guild_id).ok_or_else(|| {
            format!("not in a voice channel, use {}join first", self.prefix)
        })?;

        let control = session.control();

        match command {
            Command::PitchUp => control.set_raised(),
            Command::PitchDown => control.set_lowered(),
            Command::Gender(direction) => control.set_cross_gender(direction),
            Command::Custom(semitones) => control.set_custom(semitones),
            Command::Off => control.set_off(),
            Command::Join | Command::Leave | Command::Status | Command::Usage(_) => unreachable!(),
        }

        let mode = control.mode();
        info!(guild = guild_id.0, ?mode, "mode changed");

        Ok(format!("mode changed: {}", mode.describe()))
    }

    fn status(&self, guild_id: GuildId) -> String {
        match self.registry.session(guild_id) {
            Some(session) => format!(
                "mode: {}\nengine: {}\nbuffered: {} ms\n\n{}",
                session.control().mode().describe(),
                session.engine_name(),
                session.playback().buffered_duration().as_millis(),
                help_text(&self.prefix),
            ),
            None => format!(
                "not connected, use {}join to start\n\n{}",
                self.prefix,
                help_text(&self.prefix),
            ),
        }
    }

    /// How many users share the voice channel the bot is in, bot included
    fn occupants_of_own_channel(&self, context: &Context, guild_id: GuildId) -> Option<usize> {
        let guild = context.cache.guild(guild_id)?;
        let own_id = context.cache.current_user_id();

        let own_channel = guild
            .voice_states
            .get(&own_id)
            .and_then(|state| state.channel_id)?;

        let occupants = guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(own_channel))
            .count();

        Some(occupants)
    }
}

/// Feeds decoded per-speaker voice packets into the session and starts
/// playback the first time audio arrives
#[derive(Clone)]
struct VoiceReceiver {
    session: Arc<AudioSession>,

    /// Weak so the handler does not keep the call alive after leave
    call: Weak<tokio::sync::Mutex<Call>>,

    /// SSRC by user, so a disconnect can drop the right speaker buffer
    speaking: Arc<Mutex<HashMap<u64, u32>>>,
}

impl VoiceReceiver {
    fn new(session: Arc<AudioSession>, call: Weak<tokio::sync::Mutex<Call>>) -> Self {
        Self {
            session,
            call,
            speaking: Default::default(),
        }
    }

    async fn start_playback(&self) {
        let Some(call) = self.call.upgrade() else {
            warn!("voice call was gone before playback could start");
            return;
        };

        call.lock()
            .await
            .play_only_source(self.session.stream().into_input());

        info!("playback started");
    }
}

#[async_trait]
impl VoiceEventHandler for VoiceReceiver {
    async fn act(&self, context: &EventContext<'_>) -> Option<Event> {
        match context {
            EventContext::VoicePacket(data) => {
                if let Some(audio) = data.audio {
                    if self.session.ingest(data.packet.ssrc, audio) {
                        self.start_playback().await;
                    }
                } else {
                    warn!(ssrc = data.packet.ssrc, "voice packet arrived undecoded");
                }
            }
            EventContext::SpeakingStateUpdate(Speaking { ssrc, user_id, .. }) => {
                if let Some(user) = user_id {
                    debug!(ssrc = *ssrc, user = user.0, "speaker mapped");
                    self.speaking.lock().insert(user.0, *ssrc);
                }
            }
            EventContext::ClientDisconnect(ClientDisconnect { user_id }) => {
                if let Some(ssrc) = self.speaking.lock().remove(&user_id.0) {
                    self.session.remove_speaker(ssrc);
                }
            }
            _ => {}
        }

        None
    }
}

async fn manager(context: &Context) -> Arc<Songbird> {
    songbird::get(context)
        .await
        .expect("songbird is registered at client init")
}

fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_VOICE_STATES
}
