use std::sync::RwLock;
use thiserror::Error;

/// Upper bound of every Modbus address space.
pub const MAX_SPACE_SIZE: usize = 65536;

/// Largest span a single store call may touch, matching the widest
/// per-function quantity on the wire.
pub const MAX_SPAN: u16 = 2000;

/// Single-bit spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitSpace {
    Coils,
    DiscreteInputs,
}

/// 16-bit word spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordSpace {
    Holding,
    Input,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("address span out of range")]
    IllegalAddress,
    #[error("data bank lock poisoned")]
    Poisoned,
}

/// Per-space sizes, fixed at construction. Values above [`MAX_SPACE_SIZE`]
/// are capped; spaces are never resized afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankSizes {
    pub coils: usize,
    pub discrete_inputs: usize,
    pub holding_registers: usize,
    pub input_registers: usize,
}

impl Default for BankSizes {
    fn default() -> Self {
        Self::uniform(MAX_SPACE_SIZE)
    }
}

impl BankSizes {
    pub const fn uniform(size: usize) -> Self {
        Self {
            coils: size,
            discrete_inputs: size,
            holding_registers: size,
            input_registers: size,
        }
    }
}

/// Thread-safe storage for the four data spaces.
///
/// Each space sits behind its own `RwLock`, so a multi-value write is atomic
/// with respect to readers of the same space while traffic on other spaces
/// proceeds concurrently. A failed call leaves the bank untouched.
#[derive(Debug)]
pub struct DataBank {
    coils: RwLock<Vec<bool>>,
    discrete_inputs: RwLock<Vec<bool>>,
    holding_registers: RwLock<Vec<u16>>,
    input_registers: RwLock<Vec<u16>>,
}

impl Default for DataBank {
    fn default() -> Self {
        Self::new()
    }
}

impl DataBank {
    /// Full 65536-point bank in every space.
    pub fn new() -> Self {
        Self::with_sizes(BankSizes::default())
    }

    pub fn with_sizes(sizes: BankSizes) -> Self {
        Self {
            coils: RwLock::new(vec![false; sizes.coils.min(MAX_SPACE_SIZE)]),
            discrete_inputs: RwLock::new(vec![false; sizes.discrete_inputs.min(MAX_SPACE_SIZE)]),
            holding_registers: RwLock::new(vec![0; sizes.holding_registers.min(MAX_SPACE_SIZE)]),
            input_registers: RwLock::new(vec![0; sizes.input_registers.min(MAX_SPACE_SIZE)]),
        }
    }

    fn bit_bank(&self, space: BitSpace) -> &RwLock<Vec<bool>> {
        match space {
            BitSpace::Coils => &self.coils,
            BitSpace::DiscreteInputs => &self.discrete_inputs,
        }
    }

    fn word_bank(&self, space: WordSpace) -> &RwLock<Vec<u16>> {
        match space {
            WordSpace::Holding => &self.holding_registers,
            WordSpace::Input => &self.input_registers,
        }
    }

    pub fn read_bits(
        &self,
        space: BitSpace,
        start: u16,
        count: u16,
    ) -> Result<Vec<bool>, StoreError> {
        let bank = self.bit_bank(space).read().map_err(|_| StoreError::Poisoned)?;
        let range = span(start, count, bank.len())?;
        Ok(bank[range].to_vec())
    }

    pub fn write_bits(
        &self,
        space: BitSpace,
        start: u16,
        values: &[bool],
    ) -> Result<(), StoreError> {
        let count = u16::try_from(values.len()).map_err(|_| StoreError::IllegalAddress)?;
        let mut bank = self
            .bit_bank(space)
            .write()
            .map_err(|_| StoreError::Poisoned)?;
        let range = span(start, count, bank.len())?;
        bank[range].copy_from_slice(values);
        Ok(())
    }

    pub fn read_words(
        &self,
        space: WordSpace,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, StoreError> {
        let bank = self
            .word_bank(space)
            .read()
            .map_err(|_| StoreError::Poisoned)?;
        let range = span(start, count, bank.len())?;
        Ok(bank[range].to_vec())
    }

    pub fn write_words(
        &self,
        space: WordSpace,
        start: u16,
        values: &[u16],
    ) -> Result<(), StoreError> {
        let count = u16::try_from(values.len()).map_err(|_| StoreError::IllegalAddress)?;
        let mut bank = self
            .word_bank(space)
            .write()
            .map_err(|_| StoreError::Poisoned)?;
        let range = span(start, count, bank.len())?;
        bank[range].copy_from_slice(values);
        Ok(())
    }

    pub fn bit(&self, space: BitSpace, address: u16) -> Result<bool, StoreError> {
        Ok(self.read_bits(space, address, 1)?[0])
    }

    pub fn set_bit(&self, space: BitSpace, address: u16, value: bool) -> Result<(), StoreError> {
        self.write_bits(space, address, &[value])
    }

    pub fn word(&self, space: WordSpace, address: u16) -> Result<u16, StoreError> {
        Ok(self.read_words(space, address, 1)?[0])
    }

    pub fn set_word(&self, space: WordSpace, address: u16, value: u16) -> Result<(), StoreError> {
        self.write_words(space, address, &[value])
    }
}

fn span(start: u16, count: u16, len: usize) -> Result<std::ops::Range<usize>, StoreError> {
    if count == 0 || count > MAX_SPAN {
        return Err(StoreError::IllegalAddress);
    }
    let start = usize::from(start);
    let end = start + usize::from(count);
    if end > len {
        return Err(StoreError::IllegalAddress);
    }
    Ok(start..end)
}
