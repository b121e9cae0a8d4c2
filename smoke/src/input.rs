use crate::rng::{self, SmokeRng};
use crate::settings::Settings;
use std::rc::Rc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PointerId {
    Mouse,
    Touch(u64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pointer {
    pub id: PointerId,
    /// Position in surface pixels, origin at the top left.
    pub x: f32,
    pub y: f32,
    /// Gain-scaled displacement of the latest move.
    pub dx: f32,
    pub dy: f32,
    pub down: bool,
    /// Set by a move while down. Cleared once the stepper has splatted it.
    pub moved: bool,
    pub color: [f32; 3],
    pub movements: u32,
}

impl Pointer {
    fn new(id: PointerId, x: f32, y: f32, color: [f32; 3]) -> Self {
        Self {
            id,
            x,
            y,
            dx: 0.0,
            dy: 0.0,
            down: true,
            moved: false,
            color,
            movements: 0,
        }
    }
}

/// A splat requested outside of pointer input, applied on the next step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Impulse {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub color: [f32; 3],
}

pub struct Pointers {
    settings: Rc<Settings>,
    rng: SmokeRng,
    pointers: Vec<Pointer>,
    impulses: Vec<Impulse>,
}

impl Pointers {
    pub fn new(settings: &Rc<Settings>) -> Self {
        Self {
            settings: Rc::clone(settings),
            rng: rng::from_seed(&settings.seed),
            pointers: Vec::new(),
            impulses: Vec::new(),
        }
    }

    pub fn press(&mut self, id: PointerId, x: f32, y: f32) {
        match self.position(id) {
            // A hovering mouse is already down. Keep its pending move.
            Some(index) if id == PointerId::Mouse && self.pointers[index].down => (),
            Some(index) => {
                let pointer = &mut self.pointers[index];
                pointer.x = x;
                pointer.y = y;
                pointer.dx = 0.0;
                pointer.dy = 0.0;
                pointer.down = true;
                pointer.moved = false;
            }
            None => self.track(id, x, y),
        }
    }

    /// Only the latest move before a step is splatted. Earlier deltas are
    /// overwritten.
    pub fn move_to(&mut self, id: PointerId, x: f32, y: f32) {
        let Some(index) = self.position(id) else {
            // A hovering mouse is never pressed. Start tracking it here so
            // the next move has something to measure against.
            self.track(id, x, y);
            return;
        };

        let gain = self.settings.pointer_gain;
        let interval = self.settings.color_cycle_interval;
        let pointer = &mut self.pointers[index];

        pointer.movements += 1;
        if pointer.movements > interval {
            pointer.color = rng::random_color(&mut self.rng);
            pointer.movements = 0;
        }

        pointer.dx = (x - pointer.x) * gain;
        pointer.dy = (y - pointer.y) * gain;
        pointer.x = x;
        pointer.y = y;
        pointer.moved = pointer.down;
    }

    /// The pointer stops splatting, including any move not yet consumed.
    pub fn release(&mut self, id: PointerId) {
        if let Some(index) = self.position(id) {
            let pointer = &mut self.pointers[index];
            pointer.down = false;
            pointer.moved = false;
        }
    }

    pub fn queue(&mut self, impulse: Impulse) {
        self.impulses.push(impulse);
    }

    pub fn take_impulses(&mut self) -> Vec<Impulse> {
        std::mem::take(&mut self.impulses)
    }

    pub fn get(&self, id: PointerId) -> Option<&Pointer> {
        self.pointers.iter().find(|pointer| pointer.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pointer> {
        self.pointers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pointer> {
        self.pointers.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn rng(&mut self) -> &mut SmokeRng {
        &mut self.rng
    }

    // Start tracking a new pointer with a fresh colour. Touches get a new id
    // on every contact, so a released pointer's slot is taken over first.
    fn track(&mut self, id: PointerId, x: f32, y: f32) {
        let color = rng::random_color(&mut self.rng);
        let pointer = Pointer::new(id, x, y, color);

        match self
            .pointers
            .iter_mut()
            .find(|tracked| !tracked.down && !tracked.moved)
        {
            Some(slot) => *slot = pointer,
            None => self.pointers.push(pointer),
        }
    }

    fn position(&self, id: PointerId) -> Option<usize> {
        self.pointers.iter().position(|pointer| pointer.id == id)
    }
}
