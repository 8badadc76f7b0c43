//! Actor domain: what happens when two actors touch.

use super::Actor;
use crate::physics::PhysicsWorld;

/// Resolves `actor` touching `other`, from `actor`'s side: bouncing on it,
/// hitting it with the current attack, or taking its contact damage.
///
/// Call once per ordered pair so both sides get their turn.
pub fn resolve_contact(actor: &mut Actor, other: &mut Actor, world: &mut PhysicsWorld) {
    if actor.is_dead() || other.is_dead() {
        return;
    }
    let (Some(body), Some(other_body)) = (world.body(actor.body()), world.body(other.body()))
    else {
        return;
    };
    if !body.is_enabled() || !other_body.is_enabled() {
        return;
    }

    let position = body.position();
    let other_position = other_body.position();
    let other_box = other_body.aabb();
    let touching = body.aabb().intersects(&other_box);
    let hostile = actor.team().is_hostile_to(other.team());
    let bounces = touching
        && other.settings.can_bounce_on
        && actor.controller().can_bounce(body, other_box);
    let hit = actor.attacks().current().and_then(|attack| {
        let hitbox = attack.hitbox(position, actor.controller().direction())?;
        let settings = attack.settings.hitbox.as_ref()?;
        hitbox
            .intersects(&other_box)
            .then_some((settings.damage, settings.knockback))
    });

    if bounces {
        actor.start_bounce(world, other_box);
        let damage = actor
            .controller()
            .states()
            .bounce
            .as_ref()
            .map_or(0, |b| b.settings.damage_dealt);
        other.damage(world, damage, position, false);
        return;
    }

    if hostile
        && let Some((damage, knockback)) = hit
        && actor.strike(other.body())
    {
        other.damage(world, damage, position, knockback);
    }

    if touching && hostile && other.settings.contact_damage > 0 {
        actor.damage(world, other.settings.contact_damage, other_position, true);
    }
}
