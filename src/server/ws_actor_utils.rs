use actix::ActorContext;
use actix_web_actors::ws;

use crate::server::anti_spam::AntiSpamState;
use crate::server::error::RoomError;
use crate::server::ws_error::{ws_banned_message, ws_error_message};

/// Helpers shared by WebSocket actors that talk to players.
pub trait WsActorUtils {
    fn anti_spam(&mut self) -> &mut AntiSpamState;
    /// Identifies the connection in logs.
    fn label(&self) -> String;

    /// Send a ban notice, close and stop the actor.
    fn send_ban_and_close<A>(&mut self, ctx: &mut ws::WebsocketContext<A>)
    where
        A: actix::Actor<Context = ws::WebsocketContext<A>>,
    {
        let remaining = self.anti_spam().ban_remaining_secs();
        ctx.text(ws_banned_message(remaining));
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Policy,
            description: Some("Banned for spam".into()),
        }));
        ctx.stop();
    }

    /// Report an error to this connection only, applying anti-spam rules.
    fn send_error_and_maybe_ban<A>(&mut self, ctx: &mut ws::WebsocketContext<A>, err: &RoomError)
    where
        A: actix::Actor<Context = ws::WebsocketContext<A>>,
    {
        let label = self.label();
        if !self.anti_spam().should_send_error(&err.to_string(), &label) {
            return;
        }
        if self.anti_spam().record_response(&label) {
            self.send_ban_and_close(ctx);
            return;
        }
        ctx.text(ws_error_message(err));
    }
}
