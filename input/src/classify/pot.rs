use std::fmt::{Debug, Formatter};
use std::ops::RangeInclusive;
use log::{debug, trace, warn};
use crate::classify::{KeyEmitter, Transition};
use crate::{AnalogInput, InputError, InputResult, Key};

/// A single entry of a [PositionTable].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Band {
    pub center: u16,
    pub key: Key,
}

impl Band {
    /// Gets the range of samples that fall into this band, clamped to the `u16` range.
    pub fn range(&self, spread: u16) -> RangeInclusive<u16> {
        self.center.saturating_sub(spread)..=self.center.saturating_add(spread)
    }

    pub fn contains(&self, sample: u16, spread: u16) -> bool {
        self.range(spread).contains(&sample)
    }
}

/// A band matched by a poll, with its 1-based position number.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BandMatch {
    pub position: usize,
    pub key: Key,
}

/// A fixed-capacity table of bands, addressed by 1-based position numbers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PositionTable {
    slots: Vec<Option<Band>>,
}

impl PositionTable {
    pub fn new(capacity: usize) -> Self {
        PositionTable { slots: vec![None; capacity] }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Gets the number of registered bands.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_position(&self, position: usize) -> InputResult<usize> {
        if position == 0 || position > self.capacity() {
            return Err(InputError::OutOfRange { position, capacity: self.capacity() });
        }
        Ok(position - 1)
    }

    /// Sets the band at `position`, returning the band it replaced, if any.
    ///
    /// # Errors
    /// - `InputError::OutOfRange` if `position` isn't in `1..=capacity`.
    pub fn insert(&mut self, position: usize, band: Band) -> InputResult<Option<Band>> {
        let index = self.check_position(position)?;
        Ok(self.slots[index].replace(band))
    }

    /// Sets the band at the position after the highest one registered so far.
    /// Returns the position used.
    ///
    /// # Errors
    /// - `InputError::CapacityExceeded` if the last position is already taken.
    pub fn push(&mut self, band: Band) -> InputResult<usize> {
        let next = self
            .slots
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |index| index + 1);

        let capacity = self.capacity();
        let slot = self
            .slots
            .get_mut(next)
            .ok_or(InputError::CapacityExceeded { capacity })?;
        *slot = Some(band);
        Ok(next + 1)
    }

    /// Gets the band at `position`.
    ///
    /// # Errors
    /// - `InputError::OutOfRange` if `position` isn't in `1..=capacity`.
    pub fn get(&self, position: usize) -> InputResult<Option<Band>> {
        let index = self.check_position(position)?;
        Ok(self.slots[index])
    }

    /// Iterates the registered bands in position order, with their position numbers.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Band)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, band)| band.map(|band| (index + 1, band)))
    }

    /// Finds the first band, in position order, containing `sample`.
    ///
    /// Overlapping bands resolve to the lowest position, not the closest center.
    pub fn find(&self, sample: u16, spread: u16) -> Option<BandMatch> {
        self.iter()
            .find(|(_, band)| band.contains(sample, spread))
            .map(|(position, band)| BandMatch { position, key: band.key })
    }
}

/// A potentiometer classified into discrete positions.
///
/// Each position is a band of `center ± spread`. Samples outside every band keep the last matched
/// position, so the knob stays where it was until it reaches the next band.
pub struct BandedPot<S> {
    input: S,
    spread: u16,
    table: PositionTable,
    value: Option<u16>,
    current: Option<BandMatch>,
    changed: bool,
}

impl<S: AnalogInput> BandedPot<S> {
    pub fn new(input: S, capacity: usize, spread: u16) -> Self {
        BandedPot {
            input,
            spread,
            table: PositionTable::new(capacity),
            value: None,
            current: None,
            changed: false,
        }
    }

    /// Registers the band for the given 1-based position, replacing any previous one.
    ///
    /// # Errors
    /// - `InputError::OutOfRange` if `position` isn't in `1..=capacity`.
    pub fn add_band(&mut self, position: usize, center: u16, key: Key) -> InputResult<()> {
        let band = Band { center, key };
        if let Some(old) = self.table.insert(position, band)? {
            warn!("{:?}: position {} redefined from {:?} to {:?}", self, position, old, band);
        } else {
            debug!("{:?}: position {} = {:?}", self, position, band);
        }
        Ok(())
    }

    /// Registers a band at the position after the last registered one. Returns that position.
    ///
    /// # Errors
    /// - `InputError::CapacityExceeded` if the table has no position left.
    pub fn push_band(&mut self, center: u16, key: Key) -> InputResult<usize> {
        let position = self.table.push(Band { center, key })?;
        debug!("{:?}: position {} = {:?}", self, position, (center, key));
        Ok(position)
    }

    /// Reads the input once and classifies it.
    ///
    /// Returns the current position (if any band matched so far) and whether it changed in this poll.
    pub fn poll(&mut self) -> InputResult<Transition<Option<BandMatch>>> {
        let sample = self.input.read()?;
        self.value = Some(sample);

        let found = self.table.find(sample, self.spread);
        self.changed = match found {
            Some(found) => {
                let changed = self.current.map(|m| m.position) != Some(found.position);
                self.current = Some(found);
                changed
            }
            None => false,
        };

        if self.changed {
            trace!("{:?}: {} -> {:?}", self, sample, self.current);
        }

        Ok(Transition::new(self.current, self.changed))
    }

    /// Gets the raw sample read by the last poll.
    pub fn value(&self) -> Option<u16> {
        self.value
    }

    /// Gets the 1-based position matched most recently.
    pub fn position(&self) -> Option<usize> {
        self.current.map(|m| m.position)
    }

    pub fn key(&self) -> Option<Key> {
        self.current.map(|m| m.key)
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn spread(&self) -> u16 {
        self.spread
    }

    pub fn table(&self) -> &PositionTable {
        &self.table
    }
}

impl<S: Debug> Debug for BandedPot<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BandedPot({:?}, ±{})", self.input, self.spread)
    }
}

impl<S: AnalogInput> KeyEmitter for BandedPot<S> {
    fn tick(&mut self) -> InputResult<()> {
        self.poll().map(|_| ())
    }

    fn key(&self) -> Option<Key> {
        BandedPot::key(self)
    }

    fn changed(&self) -> bool {
        self.changed
    }
}
