//! Controller domain: the state machine that decides which movement state owns
//! the body each tick.
//!
//! States talk back to the machine only through queued `Request`s, which are
//! applied in order once the callback that issued them returns. A transition
//! can issue further requests of its own; a runaway chain is cut off after
//! `MAX_REQUESTS_PER_CALL`.

use std::collections::VecDeque;

use bevy::prelude::*;

use super::StateId;
use super::context::{
    ControllerEnv, ControllerEvent, ControllerStatus, FRAMES_SINCE_DROP_CAP, Request,
    StateContext, TurnKind,
};
use super::settings::{ControllerSettings, StateSettings};
use super::states::{MovementState, StateFacts, StateSet};
use crate::core::{Countdown, Horizontal, secs_to_ticks};
use crate::physics::{Aabb, KinematicBody, drop_through_floor_below};

const MAX_REQUESTS_PER_CALL: usize = 32;

/// States that read input, in the order they are polled.
const POLL_ORDER: [StateId; 5] = [
    StateId::Ladder,
    StateId::Crouching,
    StateId::WallCling,
    StateId::Jumping,
    StateId::Dashing,
];

#[derive(Debug, Clone)]
pub struct MovementController {
    settings: ControllerSettings,
    states: StateSet,
    status: ControllerStatus,
    events: Vec<ControllerEvent>,
    started: bool,
}

impl MovementController {
    pub fn new(settings: ControllerSettings, state_settings: &StateSettings) -> Self {
        let states = StateSet::new(&settings, state_settings);
        let status = ControllerStatus {
            direction: settings.starting_direction,
            ..default()
        };
        Self {
            settings,
            states,
            status,
            events: Vec::new(),
            started: false,
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn states(&self) -> &StateSet {
        &self.states
    }

    /// Direct access for tuning states at runtime, e.g. enabling or disabling one.
    pub fn states_mut(&mut self) -> &mut StateSet {
        &mut self.states
    }

    pub fn status(&self) -> &ControllerStatus {
        &self.status
    }

    pub fn current(&self) -> StateId {
        self.status.current
    }

    pub fn previous(&self) -> StateId {
        self.status.previous
    }

    pub fn direction(&self) -> Horizontal {
        self.status.direction
    }

    pub fn is_enabled(&self) -> bool {
        self.status.is_enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.status.is_enabled = enabled;
    }

    /// Takes every event recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<ControllerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Samples input and lets input-driven states request transitions, then
    /// starts attacks.
    pub fn poll(&mut self, env: &mut ControllerEnv<'_>) {
        self.ensure_started(env);
        let reverse_on_wall = self
            .states
            .wall_cling
            .as_ref()
            .is_some_and(|w| w.settings.attacks_reverse_on_wall);
        let (states, mut ctx) = self.split(env);
        if ctx.status.is_dead {
            return;
        }

        ctx.status.axis = ctx.input.axis;
        drop_through_one_way(&mut ctx);

        for id in POLL_ORDER {
            run(states, &mut ctx, id, |state, ctx| state.poll(ctx));
        }

        if ctx.status.is_enabled {
            let attack_ctx = ctx.attack_context(reverse_on_wall);
            if let Some(index) = ctx.attacks.poll(ctx.input, &attack_ctx, &mut *ctx.animator) {
                debug!("Attack {} started from {:?}", index, ctx.status.current);
            }
        }
    }

    /// Advances timers, applies physics-driven transitions and runs every
    /// state's per-tick movement.
    pub fn fixed_update(&mut self, env: &mut ControllerEnv<'_>) {
        self.ensure_started(env);
        let (states, mut ctx) = self.split(env);

        tick_timers(states, &mut ctx);
        detect_gravity_change(&mut ctx);

        if !ctx.status.is_enabled || ctx.status.is_dead {
            return;
        }

        apply_physics_flags(states, &mut ctx);

        let current = ctx.status.current;
        if states.is_enabled(current) {
            run(states, &mut ctx, current, |state, ctx| state.update_movement(ctx));
        }
        for id in StateId::ALL {
            if id.is_concurrent() && id != current && states.is_enabled(id) {
                run(states, &mut ctx, id, |state, ctx| state.update_movement(ctx));
            }
        }

        for id in StateId::ALL {
            if states.is_enabled(id) {
                run(states, &mut ctx, id, |state, ctx| state.fixed_update(ctx));
            }
        }
    }

    /// Called once an attack finishes so the current state can restore its clip.
    pub fn on_attack_complete(&mut self, env: &mut ControllerEnv<'_>) {
        self.ensure_started(env);
        let (states, mut ctx) = self.split(env);
        let current = ctx.status.current;
        run(states, &mut ctx, current, |state, ctx| {
            state.play_animation_for_substate(ctx)
        });
    }

    /// Switches to `id` if the state admits itself.
    pub fn request_state(&mut self, env: &mut ControllerEnv<'_>, id: StateId, interrupt: bool) {
        self.submit(env, Request::Begin { id, interrupt });
    }

    /// Switches to `id` without asking it.
    pub fn force_state(&mut self, env: &mut ControllerEnv<'_>, id: StateId) {
        self.submit(env, Request::Force(id));
    }

    /// Default when standing, Falling when airborne. Ignored during knockback.
    pub fn set_state_to_default(&mut self, env: &mut ControllerEnv<'_>, interrupt: bool) {
        self.submit(env, Request::ToDefault { interrupt });
    }

    pub fn end_all_states(&mut self, env: &mut ControllerEnv<'_>) {
        self.ensure_started(env);
        let (states, mut ctx) = self.split(env);
        end_all_states(states, &mut ctx);
    }

    /// Knocks the body toward `direction`. The current attack is canceled first
    /// when its table says knockback cancels it.
    pub fn knockback(&mut self, env: &mut ControllerEnv<'_>, direction: Horizontal) {
        let Some(knockback) = self.states.knockback.as_mut() else {
            return;
        };
        knockback.set_direction(direction);
        env.attacks.cancel_if(|c| c.on_knockback);
        self.submit(env, Request::Begin {
            id: StateId::Knockback,
            interrupt: false,
        });
    }

    pub fn stun(&mut self, env: &mut ControllerEnv<'_>) {
        self.ensure_started(env);
        let (_, mut ctx) = self.split(env);
        ctx.stun();
    }

    pub fn set_to_dead(&mut self, env: &mut ControllerEnv<'_>) {
        self.ensure_started(env);
        let (states, mut ctx) = self.split(env);
        end_all_states(states, &mut ctx);
        ctx.requests.clear();
        ctx.status.is_knockback_active = false;
        ctx.status.is_dashing = false;
        set_state(states, &mut ctx, StateId::Death, true);
        drain(states, &mut ctx);
        ctx.status.is_dead = true;
        info!("Controller set to dead");
    }

    pub fn set_to_alive(&mut self, env: &mut ControllerEnv<'_>) {
        self.status.is_dead = false;
        env.body.set_enabled(true);
        self.submit(env, Request::ToDefault { interrupt: true });
    }

    /// Whether landing on `other` right now would start a bounce.
    pub fn can_bounce(&self, body: &KinematicBody, other: Aabb) -> bool {
        self.states
            .bounce
            .as_ref()
            .is_some_and(|b| b.can_bounce(body, other, self.status.is_enabled))
    }

    pub fn start_bounce(&mut self, env: &mut ControllerEnv<'_>, other: Aabb) {
        self.ensure_started(env);
        let (states, mut ctx) = self.split(env);
        let facts = states.facts(&ctx);
        ctx.facts = facts;
        if let Some(bounce) = states.bounce.as_mut() {
            bounce.start(&mut ctx, other);
        }
        drain(states, &mut ctx);
    }

    pub fn face_direction(&mut self, env: &mut ControllerEnv<'_>, direction: Horizontal) {
        self.ensure_started(env);
        let (states, mut ctx) = self.split(env);
        let facts = states.facts(&ctx);
        ctx.facts = facts;
        ctx.face_direction(direction);
        drain(states, &mut ctx);
    }

    /// Forgets the fall height, e.g. after teleporting the body.
    pub fn reset_aerial_peak(&mut self, y: f32) {
        self.status.aerial_peak = y;
    }

    fn submit(&mut self, env: &mut ControllerEnv<'_>, request: Request) {
        self.ensure_started(env);
        let (states, mut ctx) = self.split(env);
        ctx.request(request);
        drain(states, &mut ctx);
    }

    /// Enters Default the first time the controller touches its body.
    fn ensure_started(&mut self, env: &mut ControllerEnv<'_>) {
        if self.started {
            return;
        }
        self.started = true;
        if self.settings.override_max_fall_speed > 0.0 {
            env.body.set_max_fall_speed(self.settings.override_max_fall_speed);
        }
        let (states, mut ctx) = self.split(env);
        ctx.status.gravity_scale = ctx.body.gravity_scale();
        ctx.status.aerial_peak = ctx.body.position().y;
        set_state(states, &mut ctx, StateId::Default, true);
        drain(states, &mut ctx);
    }

    fn split<'a>(&'a mut self, env: &'a mut ControllerEnv<'_>) -> (&'a mut StateSet, StateContext<'a>) {
        let ctx = StateContext {
            status: &mut self.status,
            settings: &self.settings,
            body: &mut *env.body,
            terrain: env.terrain,
            input: env.input,
            attacks: &mut *env.attacks,
            animator: &mut *env.animator,
            fixed_dt: env.fixed_dt,
            facts: StateFacts::default(),
            requests: VecDeque::new(),
            events: &mut self.events,
        };
        (&mut self.states, ctx)
    }
}

// -----------------------------------------------------------------------------
// Dispatch
// -----------------------------------------------------------------------------

/// Calls `f` on state `id` with fresh facts. Requests it issues stay queued.
fn invoke<R>(
    states: &mut StateSet,
    ctx: &mut StateContext<'_>,
    id: StateId,
    f: impl FnOnce(&mut dyn MovementState, &mut StateContext<'_>) -> R,
) -> Option<R> {
    let facts = states.facts(ctx);
    ctx.facts = facts;
    let state = states.get_mut(id)?;
    Some(f(state, ctx))
}

/// `invoke`, then apply whatever it requested.
fn run<R>(
    states: &mut StateSet,
    ctx: &mut StateContext<'_>,
    id: StateId,
    f: impl FnOnce(&mut dyn MovementState, &mut StateContext<'_>) -> R,
) -> Option<R> {
    let result = invoke(states, ctx, id, f);
    drain(states, ctx);
    result
}

fn drain(states: &mut StateSet, ctx: &mut StateContext<'_>) {
    let mut applied = 0;
    while let Some(request) = ctx.requests.pop_front() {
        applied += 1;
        if applied > MAX_REQUESTS_PER_CALL {
            warn!(
                "Dropping {} controller requests after {} in one call (last: {:?})",
                ctx.requests.len() + 1,
                MAX_REQUESTS_PER_CALL,
                request
            );
            ctx.requests.clear();
            return;
        }
        apply(states, ctx, request);
    }
}

fn apply(states: &mut StateSet, ctx: &mut StateContext<'_>, request: Request) {
    match request {
        Request::Begin { id, interrupt } => {
            let admitted = invoke(states, ctx, id, |state, ctx| state.can_initiate(ctx));
            if admitted == Some(true) {
                set_state(states, ctx, id, interrupt);
            }
        }
        Request::Force(id) => set_state(states, ctx, id, true),
        Request::ToDefault { interrupt } => set_state_to_default(states, ctx, interrupt),
        Request::End(id) => {
            invoke(states, ctx, id, |state, ctx| state.end(ctx));
        }
        Request::WallJump { frames, direction } => {
            let Some(jump) = states.jump.as_mut() else {
                return;
            };
            jump.prepare_wall_jump(frames, direction);
            set_state(states, ctx, StateId::Jumping, true);
            if let Some(jump) = states.jump.as_mut() {
                jump.finish_wall_jump();
            }
            debug!("Wall jump toward {:?}", direction);
        }
        Request::LadderExited => {
            if let Some(jump) = states.jump.as_mut() {
                jump.on_ladder_exit();
            }
        }
        Request::Bounced => {
            if let Some(jump) = states.jump.as_mut() {
                jump.on_bounce();
            }
        }
    }
}

/// The transition gate every state change goes through.
fn set_state(states: &mut StateSet, ctx: &mut StateContext<'_>, id: StateId, interrupt: bool) {
    let Some(target) = states.get(id) else {
        return;
    };
    let current = ctx.status.current;

    let knockback_blocked = id == StateId::Knockback
        && states
            .get(current)
            .is_some_and(|state| !state.core().knockback_enabled);
    // Standing up under an overhang is refused, but knockback and death still land.
    let crouch_blocked = current == StateId::Crouching
        && !matches!(id, StateId::Knockback | StateId::Death)
        && states.crouch.as_ref().is_some_and(|c| !c.can_exit(ctx));
    if knockback_blocked || crouch_blocked || ctx.status.is_dead || !target.core().enabled {
        return;
    }
    if id == current && !interrupt {
        return;
    }

    let turn_priority = target.turn_has_priority();
    let plays_on_begin = target.plays_animation_on_begin();
    if let Some(target) = states.get_mut(id) {
        target.core_mut().has_ended = false;
    }
    ctx.status.previous = current;
    ctx.status.current = id;

    if id == StateId::Knockback {
        ctx.status.is_knockback_active = true;
        invoke(states, ctx, current, |state, ctx| state.end(ctx));
    }
    invoke(states, ctx, current, |state, ctx| state.on_state_changed(ctx));

    if !turn_priority {
        ctx.cancel_turn();
    }

    debug!("State {:?} -> {:?}", current, id);
    ctx.emit(ControllerEvent::StateChanged {
        from: current,
        to: id,
    });

    invoke(states, ctx, id, |state, ctx| state.on_begin(ctx));

    if (plays_on_begin || ctx.is_attacking())
        && (!ctx.status.is_knockback_active || id == StateId::Knockback)
    {
        invoke(states, ctx, id, |state, ctx| state.play_animation(ctx));
    }
}

fn set_state_to_default(states: &mut StateSet, ctx: &mut StateContext<'_>, interrupt: bool) {
    if ctx.status.is_knockback_active {
        return;
    }
    let can_move_vertically = states
        .moving
        .as_ref()
        .is_some_and(|m| m.settings.can_move_vertically);
    let airborne = !ctx.is_on_surface()
        && ctx.body.settings().gravity.uses_gravity
        && !can_move_vertically;
    let target = if airborne {
        StateId::Falling
    } else {
        StateId::Default
    };
    set_state(states, ctx, target, interrupt);
}

fn end_all_states(states: &mut StateSet, ctx: &mut StateContext<'_>) {
    ctx.cancel_turn();
    ctx.status.stun.cancel();
    ctx.status.is_stunned = false;
    if ctx.status.drop_through.is_active() {
        ctx.status.drop_through.cancel();
        ctx.body.enable_one_way_platforms();
    }
    for id in StateId::ALL {
        invoke(states, ctx, id, |state, ctx| state.end(ctx));
    }
    drain(states, ctx);
}

// -----------------------------------------------------------------------------
// Per-tick bookkeeping
// -----------------------------------------------------------------------------

fn drop_through_one_way(ctx: &mut StateContext<'_>) {
    let wants_drop =
        ctx.is_on_surface() && ctx.input.jump.pressed_this_frame && ctx.input.axis.y == -1.0;
    if wants_drop && drop_through_floor_below(ctx.body, ctx.terrain, ctx.world_down()) {
        ctx.body.disable_one_way_platforms();
        ctx.status.drop_through =
            Countdown::from_secs(ctx.settings.drop_through_window, ctx.fixed_dt);
        debug!(
            "Dropping through one-way platform for {} ticks",
            ctx.status.drop_through.remaining()
        );
    }
}

fn tick_timers(states: &mut StateSet, ctx: &mut StateContext<'_>) {
    if ctx.status.turn.tick() {
        ctx.status.is_turning = false;
        let current = ctx.status.current;
        match ctx.status.turn_kind {
            TurnKind::Turn => {
                run(states, ctx, current, |state, ctx| {
                    state.play_animation_for_substate(ctx)
                });
            }
            TurnKind::GravityFlip => {
                run(states, ctx, current, |state, ctx| state.play_animation(ctx));
            }
        }
    }
    if ctx.status.stun.tick() {
        ctx.status.is_stunned = false;
    }
    if ctx.status.drop_through.tick() {
        ctx.body.enable_one_way_platforms();
    }
}

fn detect_gravity_change(ctx: &mut StateContext<'_>) {
    let scale = ctx.body.gravity_scale();
    let previous = ctx.status.gravity_scale;
    if scale == previous {
        return;
    }
    ctx.status.gravity_scale = scale;
    ctx.emit(ControllerEvent::GravityChanged(scale));
    if (scale >= 0.0) == (previous >= 0.0) {
        return;
    }

    // Flipping upside down plays its own clip, with turn priority.
    let settings = ctx.settings;
    let clip = settings.clips.gravity_flip.as_deref();
    let mut ticks = 1;
    if ctx.status.current != StateId::Ladder
        && !ctx.is_attacking()
        && let Some(clip) = clip
    {
        if let Some(length) = ctx.animator.clip_length(clip) {
            ticks = secs_to_ticks(length, ctx.fixed_dt).max(1);
        }
        ctx.animator.play(clip, 0.0);
    }
    ctx.status.turn = Countdown::from_ticks(ticks);
    ctx.status.turn_kind = TurnKind::GravityFlip;
    ctx.status.is_turning = true;
    debug!("Gravity flipped to {}", scale);
}

/// Landing, falling and aerial-peak bookkeeping driven by the body's contact flags.
fn apply_physics_flags(states: &mut StateSet, ctx: &mut StateContext<'_>) {
    let can_move_vertically = states
        .moving
        .as_ref()
        .is_some_and(|m| m.settings.can_move_vertically);
    let jump_can_end = states.jump.as_ref().is_none_or(|j| j.can_end());
    let y = ctx.body.position().y;

    let jump_grounded = ctx.status.current == StateId::Jumping && ctx.is_on_surface() && jump_can_end;
    if ctx.body.did_land_this_frame() || jump_grounded {
        let fall_distance = (ctx.status.aerial_peak - y).abs();
        if fall_distance > ctx.settings.landing_fall_threshold {
            if !ctx.status.is_knockback_active
                && !can_move_vertically
                && ctx.status.current != StateId::Default
                && let Some(landing) = states.landing.as_mut()
            {
                landing.check_stun(fall_distance);
                ctx.begin(StateId::Landing);
                drain(states, ctx);
            }
            ctx.emit(ControllerEvent::Landed { fall_distance });
        }

        let current = ctx.status.current;
        if !ctx.status.is_knockback_active
            && current != StateId::Landing
            && current != StateId::Ladder
        {
            set_state_to_default(states, ctx, false);
            drain(states, ctx);
        }
    }

    let g = ctx.gravity_sign();
    if ctx.is_on_surface() {
        ctx.status.aerial_peak = y;
        if ctx.status.current == StateId::Falling {
            set_state_to_default(states, ctx, false);
            drain(states, ctx);
        }
    } else if (g > 0.0 && y > ctx.status.aerial_peak) || (g < 0.0 && y < ctx.status.aerial_peak) {
        ctx.status.aerial_peak = y;
    }

    let current = ctx.status.current;
    if ctx.body.is_falling()
        && !ctx.status.is_knockback_active
        && !matches!(
            current,
            StateId::Ladder | StateId::Dashing | StateId::WallCling
        )
        && !(current == StateId::Moving && can_move_vertically)
    {
        set_state_to_default(states, ctx, false);
        drain(states, ctx);
    }

    ctx.status.frames_since_drop = (ctx.status.frames_since_drop + 1).min(FRAMES_SINCE_DROP_CAP);
}
